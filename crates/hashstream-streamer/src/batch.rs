use std::collections::HashMap;

use hashstream_types::{ByteRange, Location};

enum Fetch {
    Whole,
    Ranges(Vec<ByteRange>),
}

/// Pending pack reads for one resolution level, keyed by location.
///
/// Locations are fetched in first-seen order and ranges in append order.
/// A whole-pack fetch absorbs any ranges requested for the same location.
#[derive(Default)]
pub(crate) struct Batch {
    order: Vec<Location>,
    fetches: HashMap<Location, Fetch>,
}

impl Batch {
    pub(crate) fn add_range(&mut self, location: Location, range: ByteRange) {
        match self.fetches.get_mut(&location) {
            Some(Fetch::Ranges(ranges)) => ranges.push(range),
            Some(Fetch::Whole) => {}
            None => {
                self.order.push(location.clone());
                self.fetches.insert(location, Fetch::Ranges(vec![range]));
            }
        }
    }

    pub(crate) fn add_whole(&mut self, location: Location) {
        if self.fetches.insert(location.clone(), Fetch::Whole).is_none() {
            self.order.push(location);
        }
    }

    /// `(location, ranges)` pairs in fetch order; `None` means the whole
    /// location.
    pub(crate) fn into_fetches(mut self) -> Vec<(Location, Option<Vec<ByteRange>>)> {
        self.order
            .into_iter()
            .filter_map(|location| {
                let fetch = self.fetches.remove(&location)?;
                let ranges = match fetch {
                    Fetch::Whole => None,
                    Fetch::Ranges(ranges) => Some(ranges),
                };
                Some((location, ranges))
            })
            .collect()
    }
}
