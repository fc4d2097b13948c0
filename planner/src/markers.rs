use shared::{Coordinate, Marker, MarkerId, MarkerOrder};

pub const MAX_MARKERS: usize = 2;

/// Origin and destination picked on the map, in placement order.
///
/// Holds at most [`MAX_MARKERS`] markers. Removing the origin promotes the
/// destination to origin; every marker's `order` always matches its index.
#[derive(Debug, Clone, Default)]
pub struct MarkerSet {
    markers: Vec<Marker>,
    next_id: u64,
}

impl MarkerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a marker unless the set is already full.
    pub fn add(&mut self, coordinate: Coordinate) -> Option<MarkerId> {
        let order = MarkerOrder::from_index(self.markers.len())?;
        self.next_id += 1;
        let id = MarkerId(self.next_id);
        self.markers.push(Marker {
            id,
            coordinate,
            label: None,
            order,
        });
        Some(id)
    }

    /// Out-of-range indices are ignored.
    pub fn remove_at(&mut self, index: usize) -> bool {
        if index >= self.markers.len() {
            return false;
        }
        self.markers.remove(index);
        self.renumber();
        true
    }

    pub fn clear(&mut self) {
        self.markers.clear();
    }

    pub fn set_label(&mut self, id: MarkerId, label: String) -> bool {
        match self.markers.iter_mut().find(|marker| marker.id == id) {
            Some(marker) => {
                marker.label = Some(label);
                true
            }
            None => false,
        }
    }

    pub fn as_slice(&self) -> &[Marker] {
        &self.markers
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.markers.len() >= MAX_MARKERS
    }

    /// Origin and destination coordinates once both are placed.
    pub fn endpoints(&self) -> Option<[Coordinate; 2]> {
        match self.markers.as_slice() {
            [origin, destination] => Some([origin.coordinate, destination.coordinate]),
            _ => None,
        }
    }

    fn renumber(&mut self) {
        for (index, marker) in self.markers.iter_mut().enumerate() {
            if let Some(order) = MarkerOrder::from_index(index) {
                marker.order = order;
            }
        }
    }
}
