//! Turns an accumulating enumeration into a dependency-ordered replay.

use pkgcursor_schema::Tag;

use crate::db::DbIndex;
use crate::error::Result;
use crate::flags::GiFlags;
use crate::source::SourceKind;
use crate::ts::{Goal, Transaction};

/// Indices hidden from the database while an install set is checked.
const DEPSOLVE_INDICES: [DbIndex; 3] = [
    DbIndex::Depends,
    DbIndex::Tag(Tag::Basenames),
    DbIndex::Tag(Tag::ProvideName),
];

/// Check and order the transaction, returning the source the cursor
/// replays from.
///
/// # Errors
///
/// Returns the ordering callback's error.
pub(crate) fn finalize(ts: &Transaction, flags: GiFlags, verbose: bool) -> Result<SourceKind> {
    let erasing = flags.contains(GiFlags::ERASING);
    let db = ts.db();

    if erasing {
        ts.set_goal(Goal::Erase);
        ts.check();
    } else {
        ts.set_goal(Goal::Install);
        for index in DEPSOLVE_INDICES {
            db.block_index(index);
        }
        ts.check();
        for index in DEPSOLVE_INDICES.iter().rev() {
            db.unblock_index(*index);
        }
    }

    let problems = ts.problems();
    if !problems.is_empty() {
        tracing::info!("Failed dependencies:");
        if verbose {
            for problem in &problems {
                tracing::info!("\t{problem}");
            }
        }
        let suggestions = ts.suggestions();
        if !suggestions.is_empty() {
            tracing::info!("    Suggested resolutions:");
            for suggestion in &suggestions {
                tracing::info!("\t{suggestion}");
            }
        }
    }
    ts.clear_problems();

    if verbose {
        ts.set_loop_detection(true);
    }

    ts.order()?;
    tracing::debug!("Ordered {} transaction elements", ts.len());

    Ok(if erasing {
        SourceKind::Removed
    } else {
        SourceKind::Added
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, MatchIterator, MemoryDb};
    use pkgcursor_schema::Header;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Records which indices were blocked when each lookup happened.
    #[derive(Debug)]
    struct Spy {
        inner: MemoryDb,
        seen: RefCell<Vec<(DbIndex, bool)>>,
    }

    impl Database for Spy {
        fn open_iterator(&self, index: DbIndex, key: Option<&[u8]>) -> Option<Box<dyn MatchIterator>> {
            self.seen.borrow_mut().push((index, self.inner.is_blocked(index)));
            self.inner.open_iterator(index, key)
        }
        fn block_index(&self, index: DbIndex) {
            self.inner.block_index(index);
        }
        fn unblock_index(&self, index: DbIndex) {
            self.inner.unblock_index(index);
        }
        fn is_blocked(&self, index: DbIndex) -> bool {
            self.inner.is_blocked(index)
        }
    }

    fn spy() -> Rc<Spy> {
        Rc::new(Spy {
            inner: MemoryDb::from_headers([Header::new("lib", "1", "1")]),
            seen: RefCell::new(Vec::new()),
        })
    }

    #[test]
    fn test_install_blocks_during_check() {
        let db = spy();
        let ts = Transaction::new(db.clone());
        ts.add_install_element(
            Header::new("app", "1", "1").with_requires(["lib"]).into_ref(),
            "app.rpm",
        );

        let kind = finalize(&ts, GiFlags::TRANSACTION, false).unwrap();
        assert_eq!(kind, SourceKind::Added);
        assert_eq!(ts.goal(), Goal::Install);

        let seen = db.seen.borrow();
        assert!(!seen.is_empty());
        assert!(seen.iter().all(|(_, blocked)| *blocked));
        for index in DEPSOLVE_INDICES {
            assert!(!db.is_blocked(index));
        }
        assert!(ts.problems().is_empty());
    }

    #[test]
    fn test_erase_checks_unblocked() {
        let db = spy();
        let ts = Transaction::new(db.clone());
        ts.add_erase_element(Header::new("gone", "1", "1").into_ref(), -1);

        let kind = finalize(&ts, GiFlags::TRANSACTION | GiFlags::ERASING, true).unwrap();
        assert_eq!(kind, SourceKind::Removed);
        assert_eq!(ts.goal(), Goal::Erase);
        assert!(ts.loop_detection());
        assert!(db.seen.borrow().iter().all(|(_, blocked)| !*blocked));
    }
}
