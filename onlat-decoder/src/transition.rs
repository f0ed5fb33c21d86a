//! Transition-id to phone mapping used by end-of-utterance detection.

use crate::error::{GraphError, Result};
use crate::fst::Label;
use std::path::Path;

/// Phone identifier.
pub type Phone = u32;

/// Phone-level view of the input labels (transition ids) of the graph.
pub trait TransitionModel {
    /// Phone that `tid` belongs to, `None` for unknown ids.
    fn transition_id_to_phone(&self, tid: Label) -> Option<Phone>;

    /// Split a transition-id sequence into one group per phone instance.
    fn split_to_phones(&self, tids: &[Label]) -> Vec<Vec<Label>>;
}

/// Phone and boundary information of one transition id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransitionInfo {
    pub phone: Phone,
    /// Transition leaves the phone's last HMM state
    pub exits_phone: bool,
}

/// Table-backed [`TransitionModel`], indexed by transition id.
#[derive(Clone, Debug, Default)]
pub struct TransitionTable {
    entries: Vec<Option<TransitionInfo>>,
}

impl TransitionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tid: Label, info: TransitionInfo) {
        let i = tid as usize;
        if self.entries.len() <= i {
            self.entries.resize(i + 1, None);
        }
        self.entries[i] = Some(info);
    }

    pub fn info(&self, tid: Label) -> Option<TransitionInfo> {
        self.entries.get(tid as usize).copied().flatten()
    }

    /// Number of known transition ids.
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Parse `tid phone exits` lines, where `exits` is `0` or `1`.
    pub fn from_text(text: &str) -> Result<Self> {
        let mut table = Self::new();

        for (i, line) in text.lines().enumerate() {
            let lineno = i + 1;
            let fields: Vec<&str> = line.split_whitespace().collect();

            let [tid, phone, exits] = fields.as_slice() else {
                if fields.is_empty() {
                    continue;
                }
                return Err(GraphError::parse(lineno, "expected `tid phone exits`").into());
            };

            let tid = tid
                .parse::<Label>()
                .map_err(|e| GraphError::parse(lineno, format!("bad transition id: {e}")))?;
            let phone = phone
                .parse::<Phone>()
                .map_err(|e| GraphError::parse(lineno, format!("bad phone: {e}")))?;
            let exits_phone = match *exits {
                "0" => false,
                "1" => true,
                other => {
                    return Err(
                        GraphError::parse(lineno, format!("bad exit flag {other:?}")).into(),
                    );
                }
            };

            table.insert(tid, TransitionInfo { phone, exits_phone });
        }

        Ok(table)
    }

    pub fn read_text(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_text(&text)
    }
}

impl TransitionModel for TransitionTable {
    fn transition_id_to_phone(&self, tid: Label) -> Option<Phone> {
        self.info(tid).map(|info| info.phone)
    }

    /// A group ends after a transition that exits its phone, or where the
    /// phone changes.
    fn split_to_phones(&self, tids: &[Label]) -> Vec<Vec<Label>> {
        let mut groups: Vec<Vec<Label>> = Vec::new();
        let mut closed = true;
        let mut current = None;

        for &tid in tids {
            let info = self.info(tid);
            let phone = info.map(|i| i.phone);

            let continues = !closed && phone == current;
            match groups.last_mut() {
                Some(group) if continues => group.push(tid),
                _ => groups.push(vec![tid]),
            }

            closed = info.is_some_and(|i| i.exits_phone);
            current = phone;
        }

        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // phone 1: tids 1 (loop), 2 (exit); phone 2: tids 3 (loop), 4 (exit)
    fn table() -> TransitionTable {
        TransitionTable::from_text("1 1 0\n2 1 1\n3 2 0\n4 2 1\n").unwrap()
    }

    #[test]
    fn maps_transition_to_phone() {
        let t = table();
        assert_eq!(t.transition_id_to_phone(2), Some(1));
        assert_eq!(t.transition_id_to_phone(4), Some(2));
        assert_eq!(t.transition_id_to_phone(9), None);
        assert_eq!(t.len(), 4);
    }

    #[test]
    fn splits_on_phone_change() {
        let groups = table().split_to_phones(&[1, 1, 3, 3, 4]);
        assert_eq!(groups, vec![vec![1, 1], vec![3, 3, 4]]);
    }

    #[test]
    fn splits_repeated_phone_after_exit() {
        let groups = table().split_to_phones(&[1, 2, 1, 1, 2]);
        assert_eq!(groups, vec![vec![1, 2], vec![1, 1, 2]]);
    }

    #[test]
    fn empty_sequence_has_no_groups() {
        assert!(table().split_to_phones(&[]).is_empty());
    }

    #[test]
    fn rejects_bad_exit_flag() {
        assert!(TransitionTable::from_text("1 1 yes\n").is_err());
    }
}
