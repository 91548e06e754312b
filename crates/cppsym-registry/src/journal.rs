//! Undo journal backing `set_mark` / `roll_back` / `commit`.
//!
//! Each mutation of a reachable symbol appends a [`Command`] describing
//! how to reverse it. Commands are only kept while at least one mark is
//! open. Rolling back pops and reverses commands down to the mark.

use cppsym_core::{Mark, Symbol, SymbolId, TypeInfo};

#[derive(Debug, Clone)]
pub enum Command {
    Mark(Mark),
    AddSymbol {
        scope: SymbolId,
        name: String,
        symbol: SymbolId,
    },
    AddParent {
        class: SymbolId,
    },
    AddUsingDirective {
        scope: SymbolId,
        target: SymbolId,
    },
    AddParameter {
        function: SymbolId,
        name: String,
        param: SymbolId,
    },
    AddTemplateParameter {
        template: SymbolId,
        name: String,
        param: SymbolId,
    },
    AddConstructor {
        class: SymbolId,
    },
    AddFriend {
        class: SymbolId,
    },
    SetDefinition {
        forward: SymbolId,
        previous: Option<SymbolId>,
    },
    AddSpecialization {
        template: SymbolId,
    },
    AddExplicitSpecialization {
        template: SymbolId,
    },
    CacheInstance {
        template: SymbolId,
        args: Vec<TypeInfo>,
        deferred: bool,
    },
    /// Whole-symbol snapshot taken before an in-place edit.
    Restore {
        symbol: SymbolId,
        snapshot: Box<Symbol>,
    },
}

#[derive(Debug, Default)]
pub struct Journal {
    entries: Vec<Command>,
    open: Vec<Mark>,
    next_serial: u32,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_recording(&self) -> bool {
        !self.open.is_empty()
    }

    pub fn record(&mut self, command: Command) {
        if self.is_recording() {
            self.entries.push(command);
        }
    }

    pub fn set_mark(&mut self) -> Mark {
        let mark = Mark::new(self.next_serial);
        self.next_serial += 1;
        self.entries.push(Command::Mark(mark));
        self.open.push(mark);
        mark
    }

    pub fn is_open(&self, mark: Mark) -> bool {
        self.open.contains(&mark)
    }

    fn marker_position(&self, mark: Mark) -> Option<usize> {
        self.entries
            .iter()
            .rposition(|c| matches!(c, Command::Mark(m) if *m == mark))
    }

    /// Removes every command recorded since `mark` and returns them most
    /// recent first. Marks nested inside `mark` are closed as well.
    pub fn unwind(&mut self, mark: Mark) -> Option<Vec<Command>> {
        let open_pos = self.open.iter().position(|&m| m == mark)?;
        let start = self.marker_position(mark)?;
        self.open.truncate(open_pos);

        let mut undone: Vec<Command> = self.entries.drain(start + 1..).collect();
        self.entries.truncate(start);
        undone.reverse();
        Some(undone)
    }

    /// Closes `mark` and every mark nested inside it without undoing.
    pub fn commit(&mut self, mark: Mark) -> bool {
        let Some(open_pos) = self.open.iter().position(|&m| m == mark) else {
            return false;
        };
        let Some(start) = self.marker_position(mark) else {
            return false;
        };
        self.open.truncate(open_pos);

        if self.open.is_empty() {
            self.entries.clear();
        } else {
            // The enclosing mark still owns these records.
            let kept: Vec<Command> = self
                .entries
                .drain(start..)
                .filter(|c| !matches!(c, Command::Mark(_)))
                .collect();
            self.entries.extend(kept);
        }
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
