/// Stable handle to a unit in the graph's pool. Valid from `add` until
/// `remove`; the index may be reused afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(pub usize);

impl UnitId {
    pub fn as_number(&self) -> usize {
        self.0
    }
}

/// One edge of the graph: `from`'s output feeds `to`'s input channel
/// `channel`. The same pair may be connected at several channels, and
/// duplicate records on one channel are tolerated (they collapse onto a
/// single bus at schedule time).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connection {
    pub from: UnitId,
    pub to: UnitId,
    pub channel: usize,
}
