//! State - One recorded activation and its provenance
//!
//! States are shared through `Rc`; a computed state holds handles to the
//! states that were concatenated to produce it. Provenance always points
//! backward in time, so the graph is a DAG and reference counting frees it
//! once truncation drops the old handles.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use crate::layer::LayerId;
use crate::word::BitWord;

/// Shared handle to a state
pub type StateRef = Rc<State>;

/// Where a computed state came from
#[derive(Clone, Debug)]
pub(crate) struct Provenance {
    pub producers: Vec<StateRef>,
    pub layer: LayerId,
    /// Word offset of this state's segment in the layer output
    pub offset: usize,
}

/// An activation value with optional provenance
///
/// A state without provenance is a leaf: injected input, or a computed state
/// whose history was truncated. Leaves cannot be reinforced.
#[derive(Debug)]
pub struct State {
    value: Vec<BitWord>,
    provenance: RefCell<Option<Provenance>>,
}

impl State {
    /// Leaf state from caller-supplied words
    pub fn input(words: Vec<BitWord>) -> StateRef {
        Rc::new(Self {
            value: words,
            provenance: RefCell::new(None),
        })
    }

    /// All-zero leaf state of `width` words
    pub fn zeroed(width: usize) -> StateRef {
        Self::input(vec![0; width])
    }

    pub(crate) fn computed(value: Vec<BitWord>, provenance: Provenance) -> StateRef {
        Rc::new(Self {
            value,
            provenance: RefCell::new(Some(provenance)),
        })
    }

    pub fn value(&self) -> &[BitWord] {
        &self.value
    }

    pub fn word(&self, index: usize) -> Option<BitWord> {
        self.value.get(index).copied()
    }

    /// Width in words
    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// True when no provenance is recorded
    pub fn is_leaf(&self) -> bool {
        self.provenance.borrow().is_none()
    }

    pub fn producing_layer(&self) -> Option<LayerId> {
        self.provenance.borrow().as_ref().map(|p| p.layer)
    }

    /// Word offset of this state within its producing layer's output
    pub fn offset(&self) -> Option<usize> {
        self.provenance.borrow().as_ref().map(|p| p.offset)
    }

    /// Handles to the producing states (empty for leaves)
    pub fn producers(&self) -> Vec<StateRef> {
        self.provenance
            .borrow()
            .as_ref()
            .map(|p| p.producers.clone())
            .unwrap_or_default()
    }

    pub(crate) fn provenance(&self) -> Option<Provenance> {
        self.provenance.borrow().clone()
    }

    /// Erase provenance, keeping the value. Returns true if anything was erased.
    pub fn forget(&self) -> bool {
        self.provenance.borrow_mut().take().is_some()
    }

    /// Bound the provenance graph below this state
    ///
    /// Walks producers breadth-first. A state reached with a depth budget of
    /// one or less (the root starts at `max_depth`) forgets its provenance.
    /// A state reachable along several paths is bounded by its smallest
    /// budget, so afterwards no producer chain from this state has more than
    /// `max_depth - 1` edges. Returns the number of states that forgot.
    pub fn truncate(&self, max_depth: usize) -> usize {
        let mut budgets: HashMap<*const State, usize> = HashMap::new();
        let mut queue: VecDeque<(StateRef, usize)> = VecDeque::new();
        budgets.insert(self as *const State, max_depth);

        let mut erased = self.visit(max_depth, &mut queue);
        while let Some((state, budget)) = queue.pop_front() {
            let key = Rc::as_ptr(&state);
            if matches!(budgets.get(&key), Some(&seen) if seen <= budget) {
                continue;
            }
            budgets.insert(key, budget);
            erased += state.visit(budget, &mut queue);
        }
        log::trace!("truncate({}) erased {} states", max_depth, erased);
        erased
    }

    fn visit(&self, budget: usize, queue: &mut VecDeque<(StateRef, usize)>) -> usize {
        if budget <= 1 {
            return usize::from(self.forget());
        }
        if let Some(p) = self.provenance.borrow().as_ref() {
            for producer in &p.producers {
                queue.push_back((Rc::clone(producer), budget - 1));
            }
        }
        0
    }

    /// Length in edges of the longest producer chain below this state
    pub fn history_depth(&self) -> usize {
        let mut memo: HashMap<*const State, usize> = HashMap::new();
        self.depth_memo(&mut memo)
    }

    fn depth_memo(&self, memo: &mut HashMap<*const State, usize>) -> usize {
        let key = self as *const State;
        if let Some(&d) = memo.get(&key) {
            return d;
        }
        let depth = self
            .producers()
            .iter()
            .map(|p| 1 + p.depth_memo(memo))
            .max()
            .unwrap_or(0);
        memo.insert(key, depth);
        depth
    }
}

/// `(producer index, word index)` for each word of a concatenated input
pub(crate) fn input_positions(producers: &[StateRef]) -> impl Iterator<Item = (usize, usize)> + '_ {
    producers
        .iter()
        .enumerate()
        .flat_map(|(p, state)| (0..state.len()).map(move |w| (p, w)))
}
