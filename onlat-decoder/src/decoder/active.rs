//! Active-token table: one surviving token per graph state, in insertion order.

use crate::decoder::token::Token;
use crate::fst::StateId;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::rc::Rc;

/// Per-frame map from state to its best token.
///
/// Entries live in a vector so traversal follows insertion order; the hash
/// map only indexes into it. Replacing a token keeps the entry's position.
#[derive(Debug, Default)]
pub struct ActiveTokens {
    index: HashMap<StateId, usize>,
    entries: Vec<(StateId, Rc<Token>)>,
}

impl ActiveTokens {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `tok` at `state`, or replace the current token if `tok` is
    /// strictly cheaper. Returns whether `tok` was stored.
    pub fn insert(&mut self, state: StateId, tok: Rc<Token>) -> bool {
        match self.index.entry(state) {
            Entry::Occupied(e) => {
                let slot = &mut self.entries[*e.get()].1;
                if tok.cost() < slot.cost() {
                    *slot = tok;
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(e) => {
                e.insert(self.entries.len());
                self.entries.push((state, tok));
                true
            }
        }
    }

    pub fn get(&self, state: StateId) -> Option<&Rc<Token>> {
        self.index.get(&state).map(|&i| &self.entries[i].1)
    }

    /// Remove every entry, returning them in insertion order.
    pub fn clear(&mut self) -> Vec<(StateId, Rc<Token>)> {
        self.index.clear();
        std::mem::take(&mut self.entries)
    }

    /// Keep only entries matching `keep`, preserving order.
    pub fn retain(&mut self, mut keep: impl FnMut(StateId, &Token) -> bool) {
        self.entries.retain(|(state, tok)| keep(*state, tok));
        self.index = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, (state, _))| (*state, i))
            .collect();
    }

    pub fn iter(&self) -> impl Iterator<Item = (StateId, &Rc<Token>)> {
        self.entries.iter().map(|(state, tok)| (*state, tok))
    }

    pub fn tokens(&self) -> impl Iterator<Item = &Rc<Token>> {
        self.entries.iter().map(|(_, tok)| tok)
    }

    /// Cheapest entry; the earliest inserted wins ties.
    pub fn best(&self) -> Option<(StateId, &Rc<Token>)> {
        self.iter().fold(None, |best, (state, tok)| match best {
            Some((_, b)) if b.cost() <= tok.cost() => best,
            _ => Some((state, tok)),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
