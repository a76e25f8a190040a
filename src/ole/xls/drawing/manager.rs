//! Workbook-wide drawing registry and shape-id allocator.
//!
//! Shape ids are handed out in clusters of [`SHAPE_IDS_PER_CLUSTER`]. Cluster
//! `i` covers `[(i + 1) * 1024, (i + 2) * 1024)` and belongs to exactly one
//! drawing group; a drawing group may own several clusters. Used ids are
//! tracked in a bitmap so an id is never handed out twice in a workbook.
//!
//! The registry persists as the `Dgg` atom inside the workbook's
//! `DggContainer`. Other children of that container (picture store,
//! default properties) are carried through unchanged.

use std::sync::Arc;

use parking_lot::Mutex;
use roaring::RoaringBitmap;
use zerocopy::IntoBytes;

use crate::common::error::{Error, Result};
use crate::log::{debug, warn};
use crate::ole::escher::{
    EscherAtom, EscherDg, EscherDgg, EscherParser, EscherRecordHeader, EscherTree, FileIdCluster,
    options, record_type,
};

/// Number of shape ids in one cluster.
pub const SHAPE_IDS_PER_CLUSTER: u32 = 1024;

/// Shared handle to the workbook's drawing manager.
///
/// Every patriarch of a workbook holds a clone; allocation goes through the
/// lock so two sheets never receive the same shape id.
pub type DrawingManagerHandle = Arc<Mutex<DrawingManager>>;

/// Drawing-group registry and shape-id allocator for one workbook.
#[derive(Debug, Clone, Default)]
pub struct DrawingManager {
    clusters: Vec<FileIdCluster>,
    used_shape_ids: RoaringBitmap,
    drawing_groups: RoaringBitmap,
    shape_id_max: u32,
    shapes_saved: u32,
    drawings_saved: u32,
    /// Serialized `DggContainer` children other than the `Dgg` atom
    passthrough: Vec<u8>,
}

impl DrawingManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap into a shareable handle.
    pub fn into_handle(self) -> DrawingManagerHandle {
        Arc::new(Mutex::new(self))
    }

    /// Restore clusters and counters from a persisted `Dgg` atom.
    ///
    /// Individual used ids are not part of the atom; call
    /// [`register_existing_drawing`](Self::register_existing_drawing) for
    /// every loaded drawing.
    pub fn from_dgg(dgg: &EscherDgg) -> Self {
        let mut drawing_groups = RoaringBitmap::new();
        for cluster in &dgg.clusters {
            drawing_groups.insert(cluster.drawing_group_id);
        }
        Self {
            clusters: dgg.clusters.clone(),
            used_shape_ids: RoaringBitmap::new(),
            drawing_groups,
            shape_id_max: dgg.shape_id_max,
            shapes_saved: dgg.num_shapes_saved,
            drawings_saved: dgg.drawings_saved,
            passthrough: Vec::new(),
        }
    }

    /// Parse the body of a workbook `MSODRAWINGGROUP` record.
    pub fn from_dgg_container(data: &[u8]) -> Result<Self> {
        let mut tree = EscherTree::new();
        let roots = EscherParser::new(data).parse_into(&mut tree)?;
        let container = roots
            .iter()
            .copied()
            .find(|&id| tree.record_type(id) == Some(record_type::DGG_CONTAINER))
            .ok_or_else(|| Error::MalformedDrawing("missing DggContainer".to_string()))?;

        let mut manager = tree
            .child_by_type(container, record_type::DGG)
            .and_then(|id| tree.dgg(id))
            .map(Self::from_dgg)
            .ok_or_else(|| Error::MalformedDrawing("DggContainer without Dgg atom".to_string()))?;

        for &child in tree.children(container) {
            if tree.record_type(child) != Some(record_type::DGG) {
                manager.passthrough.extend(tree.serialize(child));
            }
        }
        Ok(manager)
    }

    /// The `Dgg` atom describing the current state.
    pub fn to_dgg(&self) -> EscherDgg {
        EscherDgg {
            shape_id_max: self.shape_id_max,
            num_shapes_saved: self.shapes_saved,
            drawings_saved: self.drawings_saved,
            clusters: self.clusters.clone(),
        }
    }

    /// Serialized `DggContainer` for the workbook `MSODRAWINGGROUP` record.
    pub fn to_dgg_container(&self) -> Vec<u8> {
        let mut tree = EscherTree::new();
        let dgg = tree.atom(record_type::DGG, options(0, 0), EscherAtom::Dgg(self.to_dgg()));
        let dgg_bytes = tree.serialize(dgg);

        let length = dgg_bytes.len() + self.passthrough.len();
        let header =
            EscherRecordHeader::new(options(0x0F, 0), record_type::DGG_CONTAINER, length as u32);

        let mut out = Vec::with_capacity(EscherRecordHeader::SIZE + length);
        out.extend_from_slice(header.as_bytes());
        out.extend_from_slice(&dgg_bytes);
        out.extend_from_slice(&self.passthrough);
        out
    }

    /// Lowest drawing group id not yet in use, starting at 1. The id is
    /// reserved immediately.
    pub fn find_new_drawing_group_id(&mut self) -> u16 {
        let id = (1..=u16::MAX as u32)
            .find(|id| !self.drawing_groups.contains(*id))
            .unwrap_or(u16::MAX as u32);
        self.drawing_groups.insert(id);
        id as u16
    }

    pub fn increment_drawings_saved(&mut self) {
        self.drawings_saved += 1;
    }

    #[inline]
    pub fn drawings_saved(&self) -> u32 {
        self.drawings_saved
    }

    #[inline]
    pub fn clusters(&self) -> &[FileIdCluster] {
        &self.clusters
    }

    #[inline]
    pub fn is_shape_id_used(&self, shape_id: u32) -> bool {
        self.used_shape_ids.contains(shape_id)
    }

    /// Allocate the lowest unused shape id for drawing group `dg_id`.
    ///
    /// Only the clusters owned by the group are searched; a new cluster is
    /// added when they are all full. The drawing's `Dg` atom is updated to
    /// reflect the new shape.
    pub fn allocate_shape_id(&mut self, dg_id: u16, dg: &mut EscherDg) -> Result<u32> {
        let dg_id = dg_id as u32;
        let free = self
            .clusters
            .iter()
            .enumerate()
            .filter(|(_, cluster)| cluster.drawing_group_id == dg_id)
            .find_map(|(index, _)| self.first_free_in_cluster(index));

        let shape_id = free.unwrap_or_else(|| cluster_start(self.clusters.len()));
        if !is_valid_shape_id(shape_id) {
            return Err(Error::InvalidShapeId(shape_id));
        }
        if free.is_none() {
            self.clusters.push(FileIdCluster {
                drawing_group_id: dg_id,
                num_shape_ids_used: 0,
            });
        }

        self.mark_used(shape_id);
        self.shapes_saved += 1;
        dg.num_shapes += 1;
        dg.last_spid = dg.last_spid.max(shape_id);

        debug!("allocated shape id {} for drawing group {}", shape_id, dg_id);
        Ok(shape_id)
    }

    /// Claim a caller-chosen shape id for drawing group `dg_id`.
    ///
    /// Fails with [`Error::InvalidShapeId`] when the id is already used or
    /// has no object id. Missing clusters up to the id's cluster are added
    /// for the group, so the allocator never hands the id out again.
    pub fn reserve_shape_id(&mut self, dg_id: u16, shape_id: u32, dg: &mut EscherDg) -> Result<()> {
        if !is_valid_shape_id(shape_id) || self.used_shape_ids.contains(shape_id) {
            return Err(Error::InvalidShapeId(shape_id));
        }
        self.claim(dg_id as u32, shape_id);
        dg.last_spid = dg.last_spid.max(shape_id);
        debug!("reserved shape id {} for drawing group {}", shape_id, dg_id);
        Ok(())
    }

    /// Record a loaded drawing: reserve its group id and every shape id it
    /// already uses. Ids without an object id are skipped.
    pub fn register_existing_drawing(&mut self, dg_id: u16, shape_ids: impl IntoIterator<Item = u32>) {
        let dg_id = dg_id as u32;
        self.drawing_groups.insert(dg_id);

        for shape_id in shape_ids {
            if !is_valid_shape_id(shape_id) {
                warn!("ignoring out-of-range shape id {} in drawing group {}", shape_id, dg_id);
                continue;
            }
            self.claim(dg_id, shape_id);
        }
    }

    fn claim(&mut self, dg_id: u32, shape_id: u32) {
        if let Some(index) = cluster_index(shape_id) {
            while self.clusters.len() <= index {
                self.clusters.push(FileIdCluster {
                    drawing_group_id: dg_id,
                    num_shape_ids_used: 0,
                });
            }
        }
        self.mark_used(shape_id);
    }

    fn first_free_in_cluster(&self, index: usize) -> Option<u32> {
        let start = cluster_start(index);
        (start..start + SHAPE_IDS_PER_CLUSTER).find(|id| !self.used_shape_ids.contains(*id))
    }

    fn mark_used(&mut self, shape_id: u32) {
        self.used_shape_ids.insert(shape_id);
        self.shape_id_max = self.shape_id_max.max(shape_id.saturating_add(1));
        if let Some(cluster) = cluster_index(shape_id).and_then(|i| self.clusters.get_mut(i)) {
            let offset = shape_id % SHAPE_IDS_PER_CLUSTER + 1;
            cluster.num_shape_ids_used = cluster.num_shape_ids_used.max(offset);
        }
    }
}

#[inline]
fn cluster_start(index: usize) -> u32 {
    (index as u32 + 1) * SHAPE_IDS_PER_CLUSTER
}

/// Whether `shape_id` maps to a 16-bit object id.
#[inline]
fn is_valid_shape_id(shape_id: u32) -> bool {
    shape_id
        .checked_sub(SHAPE_IDS_PER_CLUSTER)
        .is_some_and(|object_id| object_id <= u16::MAX as u32)
}

#[inline]
fn cluster_index(shape_id: u32) -> Option<usize> {
    (shape_id / SHAPE_IDS_PER_CLUSTER).checked_sub(1).map(|i| i as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_ids_start_at_cluster_base() {
        let mut manager = DrawingManager::new();
        let dg_id = manager.find_new_drawing_group_id();
        assert_eq!(dg_id, 1);

        let mut dg = EscherDg::default();
        assert_eq!(manager.allocate_shape_id(dg_id, &mut dg).unwrap(), 1024);
        assert_eq!(manager.allocate_shape_id(dg_id, &mut dg).unwrap(), 1025);
        assert!(manager.is_shape_id_used(1025));
        assert!(!manager.is_shape_id_used(1026));
        assert_eq!(dg.num_shapes, 2);
        assert_eq!(dg.last_spid, 1025);

        let dgg = manager.to_dgg();
        assert_eq!(dgg.shape_id_max, 1026);
        assert_eq!(dgg.clusters, vec![FileIdCluster { drawing_group_id: 1, num_shape_ids_used: 2 }]);
    }

    #[test]
    fn test_groups_get_separate_clusters() {
        let mut manager = DrawingManager::new();
        let first = manager.find_new_drawing_group_id();
        let second = manager.find_new_drawing_group_id();
        assert_eq!((first, second), (1, 2));

        let (mut dg1, mut dg2) = (EscherDg::default(), EscherDg::default());
        assert_eq!(manager.allocate_shape_id(first, &mut dg1).unwrap(), 1024);
        assert_eq!(manager.allocate_shape_id(second, &mut dg2).unwrap(), 2048);
        assert_eq!(manager.allocate_shape_id(first, &mut dg1).unwrap(), 1025);
    }

    #[test]
    fn test_full_cluster_spills_into_new_cluster() {
        let mut manager = DrawingManager::new();
        let mut dg = EscherDg::default();
        for expected in 1024..2048 {
            assert_eq!(manager.allocate_shape_id(1, &mut dg).unwrap(), expected);
        }
        assert_eq!(manager.allocate_shape_id(1, &mut dg).unwrap(), 2048);
        assert_eq!(manager.clusters().len(), 2);
        assert_eq!(manager.clusters()[0].num_shape_ids_used, 1024);
    }

    #[test]
    fn test_registered_ids_are_skipped() {
        let mut manager = DrawingManager::new();
        manager.register_existing_drawing(1, [1024, 1025, 1027]);
        assert_eq!(manager.find_new_drawing_group_id(), 2);

        let mut dg = EscherDg::default();
        assert_eq!(manager.allocate_shape_id(1, &mut dg).unwrap(), 1026);
        assert_eq!(manager.allocate_shape_id(1, &mut dg).unwrap(), 1028);
    }

    #[test]
    fn test_out_of_range_registered_ids_are_ignored() {
        let mut manager = DrawingManager::new();
        manager.register_existing_drawing(1, [u32::MAX, 1024 + 65536, 1024]);
        assert_eq!(manager.clusters().len(), 1);
        assert!(manager.is_shape_id_used(1024));
        assert!(!manager.is_shape_id_used(u32::MAX));
        assert_eq!(manager.to_dgg().shape_id_max, 1025);
    }

    #[test]
    fn test_reserved_id_is_never_allocated() {
        let mut manager = DrawingManager::new();
        let mut dg = EscherDg::default();
        assert_eq!(manager.allocate_shape_id(1, &mut dg).unwrap(), 1024);

        manager.reserve_shape_id(1, 1025, &mut dg).unwrap();
        manager.reserve_shape_id(1, 3072, &mut dg).unwrap();
        assert_eq!(dg.last_spid, 3072);
        assert_eq!(manager.clusters().len(), 3);

        assert_eq!(manager.allocate_shape_id(1, &mut dg).unwrap(), 1026);
        assert!(matches!(
            manager.reserve_shape_id(1, 1025, &mut dg),
            Err(Error::InvalidShapeId(1025))
        ));
        assert!(matches!(
            manager.reserve_shape_id(1, 1023, &mut dg),
            Err(Error::InvalidShapeId(1023))
        ));
    }

    #[test]
    fn test_dgg_container_round_trip() {
        let mut manager = DrawingManager::new();
        let dg_id = manager.find_new_drawing_group_id();
        let mut dg = EscherDg::default();
        manager.allocate_shape_id(dg_id, &mut dg).unwrap();
        manager.increment_drawings_saved();

        let bytes = manager.to_dgg_container();
        let restored = DrawingManager::from_dgg_container(&bytes).unwrap();
        assert_eq!(restored.to_dgg(), manager.to_dgg());
        assert_eq!(restored.to_dgg_container(), bytes);
    }

    #[test]
    fn test_passthrough_children_survive() {
        let mut tree = EscherTree::new();
        let dgg = tree.atom(record_type::DGG, options(0, 0), EscherAtom::Dgg(EscherDgg::default()));
        let opt = tree.atom(record_type::OPT, options(3, 0), EscherAtom::Raw(Vec::new()));
        let container = tree.container(record_type::DGG_CONTAINER, [dgg, opt]);
        let bytes = tree.serialize(container);

        let manager = DrawingManager::from_dgg_container(&bytes).unwrap();
        assert_eq!(manager.to_dgg_container(), bytes);
    }

    #[test]
    fn test_missing_dgg_is_malformed() {
        let mut tree = EscherTree::new();
        let container = tree.container(record_type::DGG_CONTAINER, []);
        let bytes = tree.serialize(container);
        assert!(matches!(
            DrawingManager::from_dgg_container(&bytes),
            Err(Error::MalformedDrawing(_))
        ));
    }
}
