use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::individual::IndividualsGroup;

/// The shared migrant database: one slot of currently-available emigrants per island, indexed by
/// island position. Islands publish into their own slot after a successful evolve step and pull
/// from the slots of islands their topology connects them to. This type carries no
/// synchronisation of its own — callers hold it behind the archipelago's migrant-database mutex,
/// the innermost lock in the documented lock ordering (island mutex -> idx map mutex -> migrant
/// mutex).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MigrantDb {
    slots: Vec<IndividualsGroup>,
}

impl MigrantDb {
    pub fn new(n: usize) -> Self {
        Self {
            slots: vec![IndividualsGroup::empty(); n],
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Grow the database by one empty slot, for a newly added island.
    pub(crate) fn push_back(&mut self) {
        self.slots.push(IndividualsGroup::empty());
    }

    /// Overwrite the emigrants published by island `i`.
    pub fn publish(&mut self, i: usize, group: IndividualsGroup) -> Result<(), Error> {
        let size = self.slots.len();
        let slot = self.slots.get_mut(i).ok_or(Error::OutOfRange { index: i, size })?;
        *slot = group;
        Ok(())
    }

    /// The emigrants currently published by island `i`.
    pub fn get(&self, i: usize) -> Result<&IndividualsGroup, Error> {
        self.slots.get(i).ok_or(Error::OutOfRange {
            index: i,
            size: self.slots.len(),
        })
    }

    /// Collect up to `cap` individuals published by the islands listed in `sources`, in the
    /// order given, stopping early once `cap` is reached. Used by a migrating island to pull
    /// from the islands its topology connects it to.
    pub fn pull(&self, sources: &[usize], cap: usize) -> Result<IndividualsGroup, Error> {
        let mut out = IndividualsGroup::empty();
        'outer: for &src in sources {
            let group = self.get(src)?;
            for k in 0..group.len() {
                if out.len() >= cap {
                    break 'outer;
                }
                out.ids.push(group.ids[k]);
                out.xs.push(group.xs[k].clone());
                out.fs.push(group.fs[k].clone());
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn group(ids: &[u64]) -> IndividualsGroup {
        IndividualsGroup {
            ids: ids.to_vec(),
            xs: ids.iter().map(|_| vec![0.0]).collect(),
            fs: ids.iter().map(|_| vec![0.0]).collect(),
        }
    }

    #[test]
    fn test_publish_and_get() {
        let mut db = MigrantDb::new(2);
        db.publish(0, group(&[1, 2])).unwrap();
        assert_eq!(db.get(0).unwrap().ids, vec![1, 2]);
        assert!(db.get(1).unwrap().is_empty());
    }

    #[test]
    fn test_publish_out_of_range() {
        let mut db = MigrantDb::new(1);
        assert!(matches!(
            db.publish(5, group(&[1])),
            Err(Error::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_pull_respects_cap_and_order() {
        let mut db = MigrantDb::new(3);
        db.publish(0, group(&[1, 2, 3])).unwrap();
        db.publish(1, group(&[4, 5])).unwrap();

        let pulled = db.pull(&[0, 1], 4).unwrap();
        assert_eq!(pulled.ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_push_back_grows_with_empty_slot() {
        let mut db = MigrantDb::new(1);
        db.push_back();
        assert_eq!(db.len(), 2);
        assert!(db.get(1).unwrap().is_empty());
    }
}
