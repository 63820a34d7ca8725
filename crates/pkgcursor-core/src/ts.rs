//! Transaction context: the accumulated install and erase elements, their
//! consistency check, and a pluggable ordering step.
//!
//! [`Transaction`] is a shared handle; clones refer to the same context, the
//! way cursors hold a linked reference to the transaction they feed.

use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};
use std::rc::Rc;

use pkgcursor_schema::{Header, HeaderRef, Tag};

use crate::db::{Database, DbIndex};
use crate::error::Result;

/// Whether an element installs or erases its package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// Pending install.
    Added,
    /// Pending erase.
    Removed,
}

/// Identity an element was registered with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementKey {
    /// Install elements are keyed by where the header came from.
    Path(String),
    /// Erase elements are keyed by database instance (negative placeholders
    /// stand in for headers without one).
    Instance(i64),
}

/// One transaction element.
#[derive(Debug, Clone)]
pub struct Element {
    /// Install or erase.
    pub kind: ElementKind,
    /// The package header.
    pub header: HeaderRef,
    /// Registration identity.
    pub key: ElementKey,
    /// Ordering layer (0 for elements with no in-transaction dependencies).
    pub depth: usize,
    /// Number of in-transaction elements depending on this one.
    pub degree: usize,
}

impl Element {
    /// `name-[epoch:]version-release.arch` of the element's header.
    pub fn nevra(&self) -> String {
        self.header.nevra()
    }
}

/// What the transaction is meant to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Goal {
    /// Install the added elements.
    #[default]
    Install,
    /// Erase the removed elements.
    Erase,
}

/// A dependency problem found by [`Transaction::check`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Problem {
    /// An added package requires a capability nothing provides.
    Requires {
        /// The missing capability.
        capability: String,
        /// NEVRA of the requiring package.
        needed_by: String,
    },
    /// Erasing would break an installed package.
    ErasureBreaks {
        /// The capability that would disappear.
        capability: String,
        /// NEVRA of the installed package that needs it.
        needed_by: String,
    },
}

impl std::fmt::Display for Problem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Requires {
                capability,
                needed_by,
            } => write!(f, "{capability} is needed by {needed_by}"),
            Self::ErasureBreaks {
                capability,
                needed_by,
            } => write!(f, "{capability} is needed by (installed) {needed_by}"),
        }
    }
}

/// Pluggable transaction ordering.
pub trait Orderer: std::fmt::Debug {
    /// Reorder `elements` in place.
    ///
    /// # Errors
    ///
    /// Returns an error if the elements cannot be ordered.
    fn order(&self, elements: &mut Vec<Element>, detect_loops: bool) -> Result<()>;
}

/// Default orderer: dependency layering with Kahn's algorithm.
///
/// Installs come first, providers before the packages requiring them;
/// erasures follow in the reverse order. Ties keep insertion order.
#[derive(Debug, Clone, Copy, Default)]
pub struct TopoOrder;

impl Orderer for TopoOrder {
    fn order(&self, elements: &mut Vec<Element>, detect_loops: bool) -> Result<()> {
        let (added, removed): (Vec<Element>, Vec<Element>) = elements
            .drain(..)
            .partition(|e| e.kind == ElementKind::Added);

        elements.extend(layer(added, detect_loops));
        let mut removed = layer(removed, detect_loops);
        removed.reverse();
        elements.extend(removed);
        Ok(())
    }
}

/// Sort one group of elements into dependency layers, setting depth and degree.
fn layer(mut group: Vec<Element>, detect_loops: bool) -> Vec<Element> {
    let n = group.len();
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut in_degree = vec![0usize; n];

    for (i, element) in group.iter().enumerate() {
        let providers: HashSet<usize> = element
            .header
            .requires
            .iter()
            .flat_map(|req| {
                group
                    .iter()
                    .enumerate()
                    .filter(move |(j, p)| *j != i && p.header.provides_capability(req))
                    .map(|(j, _)| j)
            })
            .collect();
        in_degree[i] = providers.len();
        for j in providers {
            dependents[j].push(i);
        }
    }

    for (element, deps) in group.iter_mut().zip(&dependents) {
        element.degree = deps.len();
    }

    let mut placed = vec![false; n];
    let mut order = Vec::with_capacity(n);
    let mut queue: VecDeque<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
    let mut depth = 0;

    while order.len() < n {
        if queue.is_empty() {
            // Cycle: release the earliest unplaced element.
            let Some(i) = (0..n).find(|&i| !placed[i]) else {
                break;
            };
            if detect_loops {
                tracing::warn!("LOOP: dependency cycle broken at {}", group[i].nevra());
            }
            in_degree[i] = 0;
            queue.push_back(i);
        }

        let mut layer: Vec<usize> = queue.drain(..).collect();
        layer.sort_unstable();
        let mut next = Vec::new();
        for u in layer {
            if placed[u] {
                continue;
            }
            placed[u] = true;
            group[u].depth = depth;
            order.push(u);
            for &v in &dependents[u] {
                if in_degree[v] > 0 {
                    in_degree[v] -= 1;
                    if in_degree[v] == 0 && !placed[v] {
                        next.push(v);
                    }
                }
            }
        }
        queue.extend(next);
        depth += 1;
    }

    let mut slots: Vec<Option<Element>> = group.into_iter().map(Some).collect();
    order.into_iter().filter_map(|i| slots[i].take()).collect()
}

#[derive(Debug)]
struct TsInner {
    db: Rc<dyn Database>,
    solver: Option<Rc<dyn Database>>,
    orderer: Rc<dyn Orderer>,
    elements: Vec<Element>,
    goal: Goal,
    problems: Vec<Problem>,
    suggestions: Vec<String>,
    loop_detection: bool,
    next_placeholder: i64,
}

/// Shared handle to a transaction context.
#[derive(Debug, Clone)]
pub struct Transaction {
    inner: Rc<RefCell<TsInner>>,
}

impl Transaction {
    /// Create an empty transaction over the installed database `db`.
    pub fn new(db: Rc<dyn Database>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(TsInner {
                db,
                solver: None,
                orderer: Rc::new(TopoOrder),
                elements: Vec::new(),
                goal: Goal::default(),
                problems: Vec::new(),
                suggestions: Vec::new(),
                loop_detection: false,
                next_placeholder: 0,
            })),
        }
    }

    /// Replace the ordering callback.
    pub fn set_orderer(&self, orderer: Rc<dyn Orderer>) {
        self.inner.borrow_mut().orderer = orderer;
    }

    /// Database of available packages used for suggested resolutions.
    pub fn set_solver(&self, solver: Rc<dyn Database>) {
        self.inner.borrow_mut().solver = Some(solver);
    }

    /// The installed database.
    pub fn db(&self) -> Rc<dyn Database> {
        Rc::clone(&self.inner.borrow().db)
    }

    /// Append an install element keyed by `key`.
    pub fn add_install_element(&self, header: HeaderRef, key: impl Into<String>) {
        self.push(ElementKind::Added, header, ElementKey::Path(key.into()));
    }

    /// Append an erase element keyed by `instance`.
    pub fn add_erase_element(&self, header: HeaderRef, instance: i64) {
        self.push(ElementKind::Removed, header, ElementKey::Instance(instance));
    }

    fn push(&self, kind: ElementKind, header: HeaderRef, key: ElementKey) {
        tracing::debug!("Adding {kind:?} element {}", header.nevra());
        self.inner.borrow_mut().elements.push(Element {
            kind,
            header,
            key,
            depth: 0,
            degree: 0,
        });
    }

    /// Next placeholder identity for an erased header with no instance:
    /// -1, -2, ... for the life of the transaction.
    pub fn next_erase_placeholder(&self) -> i64 {
        let mut inner = self.inner.borrow_mut();
        inner.next_placeholder -= 1;
        inner.next_placeholder
    }

    /// Snapshot of the elements, optionally restricted to one kind.
    pub fn elements(&self, kind: Option<ElementKind>) -> Vec<Element> {
        self.inner
            .borrow()
            .elements
            .iter()
            .filter(|e| kind.is_none_or(|k| e.kind == k))
            .cloned()
            .collect()
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.inner.borrow().elements.len()
    }

    /// Whether the transaction has no elements.
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().elements.is_empty()
    }

    /// Set the goal.
    pub fn set_goal(&self, goal: Goal) {
        self.inner.borrow_mut().goal = goal;
    }

    /// Current goal.
    pub fn goal(&self) -> Goal {
        self.inner.borrow().goal
    }

    /// Enable reporting of dependency loops during ordering.
    pub fn set_loop_detection(&self, enabled: bool) {
        self.inner.borrow_mut().loop_detection = enabled;
    }

    /// Whether loop reporting is enabled.
    pub fn loop_detection(&self) -> bool {
        self.inner.borrow().loop_detection
    }

    /// Problems found by the last [`Transaction::check`].
    pub fn problems(&self) -> Vec<Problem> {
        self.inner.borrow().problems.clone()
    }

    /// Suggested resolutions found by the last [`Transaction::check`].
    pub fn suggestions(&self) -> Vec<String> {
        self.inner.borrow().suggestions.clone()
    }

    /// Discard problems and suggestions.
    pub fn clear_problems(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.problems.clear();
        inner.suggestions.clear();
    }

    /// Check the elements against each other and the installed database for
    /// the current goal. Returns `true` when no problems were found.
    pub fn check(&self) -> bool {
        let (db, solver, goal, elements) = {
            let inner = self.inner.borrow();
            (
                Rc::clone(&inner.db),
                inner.solver.clone(),
                inner.goal,
                inner.elements.clone(),
            )
        };

        let problems = match goal {
            Goal::Install => check_install(db.as_ref(), &elements),
            Goal::Erase => check_erase(db.as_ref(), &elements),
        };

        let mut suggestions = Vec::new();
        if let Some(solver) = solver {
            for problem in &problems {
                let Problem::Requires { capability, .. } = problem else {
                    continue;
                };
                for nevra in providers_of(solver.as_ref(), capability, &HashSet::new()) {
                    if !suggestions.contains(&nevra) {
                        suggestions.push(nevra);
                    }
                }
            }
        }

        tracing::debug!(
            "Checked {} elements ({goal:?}): {} problems",
            elements.len(),
            problems.len()
        );
        let ok = problems.is_empty();
        let mut inner = self.inner.borrow_mut();
        inner.problems = problems;
        inner.suggestions = suggestions;
        ok
    }

    /// Order the elements with the configured [`Orderer`].
    ///
    /// # Errors
    ///
    /// Propagates the orderer's error; the elements are restored unchanged.
    pub fn order(&self) -> Result<()> {
        let (orderer, loops, mut elements) = {
            let mut inner = self.inner.borrow_mut();
            (
                Rc::clone(&inner.orderer),
                inner.loop_detection,
                std::mem::take(&mut inner.elements),
            )
        };

        let saved = elements.clone();
        let result = orderer.order(&mut elements, loops);
        self.inner.borrow_mut().elements = if result.is_ok() { elements } else { saved };
        result
    }
}

fn satisfies(header: &Header, capability: &str) -> bool {
    header.provides_capability(capability)
        || header
            .basenames
            .iter()
            .any(|b| capability.rsplit('/').next() == Some(b.as_str()) && capability.starts_with('/'))
}

/// NEVRAs of database headers providing `capability`, skipping `excluded` instances.
fn providers_of(db: &dyn Database, capability: &str, excluded: &HashSet<u32>) -> Vec<String> {
    let mut found = Vec::new();
    for tag in [Tag::ProvideName, Tag::Basenames] {
        let Some(mut it) = db.open_iterator(DbIndex::Tag(tag), Some(capability.as_bytes())) else {
            continue;
        };
        while let Some(h) = it.next_header() {
            if !excluded.contains(&h.instance) && !found.contains(&h.nevra()) {
                found.push(h.nevra());
            }
        }
    }
    found
}

fn erased_instances(elements: &[Element]) -> HashSet<u32> {
    elements
        .iter()
        .filter(|e| e.kind == ElementKind::Removed && e.header.instance > 0)
        .map(|e| e.header.instance)
        .collect()
}

fn check_install(db: &dyn Database, elements: &[Element]) -> Vec<Problem> {
    let erased = erased_instances(elements);
    let added: Vec<&Element> = elements
        .iter()
        .filter(|e| e.kind == ElementKind::Added)
        .collect();

    let mut problems = Vec::new();
    for element in &added {
        for req in &element.header.requires {
            let in_set = added.iter().any(|p| satisfies(&p.header, req));
            if in_set || !providers_of(db, req, &erased).is_empty() {
                continue;
            }
            problems.push(Problem::Requires {
                capability: req.clone(),
                needed_by: element.nevra(),
            });
        }
    }
    problems
}

fn check_erase(db: &dyn Database, elements: &[Element]) -> Vec<Problem> {
    let erased = erased_instances(elements);
    let removed: Vec<&Element> = elements
        .iter()
        .filter(|e| e.kind == ElementKind::Removed)
        .collect();
    let added: Vec<&Element> = elements
        .iter()
        .filter(|e| e.kind == ElementKind::Added)
        .collect();

    let Some(mut it) = db.open_iterator(DbIndex::Packages, None) else {
        return Vec::new();
    };

    let mut problems = Vec::new();
    while let Some(installed) = it.next_header() {
        if erased.contains(&installed.instance) {
            continue;
        }
        for req in &installed.requires {
            let lost = removed.iter().any(|r| satisfies(&r.header, req));
            if !lost {
                continue;
            }
            let replaced = added.iter().any(|a| satisfies(&a.header, req))
                || !providers_of(db, req, &erased).is_empty();
            if !replaced {
                problems.push(Problem::ErasureBreaks {
                    capability: req.clone(),
                    needed_by: installed.nevra(),
                });
            }
        }
    }
    problems
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDb;

    fn element(name: &str, requires: &[&str]) -> Element {
        Element {
            kind: ElementKind::Added,
            header: Header::new(name, "1", "1")
                .with_requires(requires.iter().copied())
                .into_ref(),
            key: ElementKey::Path(name.to_string()),
            depth: 0,
            degree: 0,
        }
    }

    fn names(elements: &[Element]) -> Vec<&str> {
        elements.iter().map(|e| e.header.name.as_str()).collect()
    }

    #[test]
    fn test_topo_order_layers() {
        let mut elements = vec![
            element("a", &["b", "c"]),
            element("b", &["d"]),
            element("c", &[]),
            element("d", &[]),
        ];
        TopoOrder.order(&mut elements, false).unwrap();

        assert_eq!(names(&elements), vec!["c", "d", "b", "a"]);
        let depth: Vec<usize> = elements.iter().map(|e| e.depth).collect();
        assert_eq!(depth, vec![0, 0, 1, 2]);
        let d = elements.iter().find(|e| e.header.name == "d").unwrap();
        assert_eq!(d.degree, 1);
    }

    #[test]
    fn test_topo_order_breaks_cycles() {
        let mut elements = vec![element("a", &["b"]), element("b", &["a"])];
        TopoOrder.order(&mut elements, true).unwrap();
        assert_eq!(names(&elements), vec!["a", "b"]);
    }

    #[test]
    fn test_erasures_follow_installs_in_reverse() {
        let mut lib = element("lib", &[]);
        lib.kind = ElementKind::Removed;
        let mut app = element("app", &["lib"]);
        app.kind = ElementKind::Removed;
        let mut elements = vec![lib, element("new", &[]), app];

        TopoOrder.order(&mut elements, false).unwrap();
        assert_eq!(names(&elements), vec!["new", "app", "lib"]);
    }

    #[test]
    fn test_check_install_reports_missing() {
        let db = MemoryDb::from_headers([Header::new("glibc", "2.38", "1")]);
        let ts = Transaction::new(Rc::new(db));
        ts.add_install_element(
            Header::new("app", "1", "1")
                .with_requires(["glibc", "libfoo"])
                .into_ref(),
            "app.rpm",
        );

        assert!(!ts.check());
        assert_eq!(
            ts.problems(),
            vec![Problem::Requires {
                capability: "libfoo".into(),
                needed_by: "app-1-1.noarch".into(),
            }]
        );
        ts.clear_problems();
        assert!(ts.problems().is_empty());
    }

    #[test]
    fn test_check_suggests_from_solver() {
        let ts = Transaction::new(Rc::new(MemoryDb::new()));
        ts.set_solver(Rc::new(MemoryDb::from_headers([Header::new(
            "libfoo", "1", "1",
        )])));
        ts.add_install_element(
            Header::new("app", "1", "1")
                .with_requires(["libfoo"])
                .into_ref(),
            "app.rpm",
        );
        assert!(!ts.check());
        assert_eq!(ts.suggestions(), vec!["libfoo-1-1.noarch"]);
    }

    #[test]
    fn test_check_erase_reports_broken_dependents() {
        let db = Rc::new(MemoryDb::from_headers([
            Header::new("lib", "1", "1"),
            Header::new("app", "1", "1").with_requires(["lib"]),
        ]));
        let ts = Transaction::new(db.clone());
        let mut it = db
            .open_iterator(DbIndex::Tag(Tag::Name), Some(b"lib".as_slice()))
            .unwrap();
        let lib = it.next_header().unwrap();
        ts.add_erase_element(lib, 1);
        ts.set_goal(Goal::Erase);

        assert!(!ts.check());
        assert_eq!(
            ts.problems()[0].to_string(),
            "lib is needed by (installed) app-1-1.noarch"
        );
    }

    #[test]
    fn test_placeholders_decrease() {
        let ts = Transaction::new(Rc::new(MemoryDb::new()));
        assert_eq!(ts.next_erase_placeholder(), -1);
        assert_eq!(ts.next_erase_placeholder(), -2);
    }

    #[test]
    fn test_failed_order_restores_elements() {
        #[derive(Debug)]
        struct Broken;
        impl Orderer for Broken {
            fn order(&self, elements: &mut Vec<Element>, _: bool) -> Result<()> {
                elements.clear();
                Err(crate::GiError::Order("broken".into()))
            }
        }

        let ts = Transaction::new(Rc::new(MemoryDb::new()));
        ts.set_orderer(Rc::new(Broken));
        ts.add_install_element(Header::new("a", "1", "1").into_ref(), "a.rpm");
        assert!(ts.order().is_err());
        assert_eq!(ts.len(), 1);
    }
}
