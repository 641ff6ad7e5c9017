//! Generation tickets for background loads.
//!
//! Each list has a generation counter. Starting a load bumps it and hands
//! out a ticket; a result is applied only if its ticket is still current.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadKind {
    Catalog,
    Characters,
    Inventory,
    Save,
}

impl LoadKind {
    const ALL: [LoadKind; 4] = [
        LoadKind::Catalog,
        LoadKind::Characters,
        LoadKind::Inventory,
        LoadKind::Save,
    ];

    fn slot(self) -> usize {
        match self {
            LoadKind::Catalog => 0,
            LoadKind::Characters => 1,
            LoadKind::Inventory => 2,
            LoadKind::Save => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub kind: LoadKind,
    generation: u64,
}

#[derive(Debug, Default)]
pub struct LoadTracker {
    generations: [u64; 4],
    pending: [bool; 4],
}

impl LoadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a load of `kind`, superseding any load of the same kind.
    pub fn issue(&mut self, kind: LoadKind) -> Ticket {
        let slot = kind.slot();
        self.generations[slot] += 1;
        self.pending[slot] = true;
        Ticket {
            kind,
            generation: self.generations[slot],
        }
    }

    /// Invalidate any in-flight load of `kind` without starting a new one.
    pub fn supersede(&mut self, kind: LoadKind) {
        let slot = kind.slot();
        self.generations[slot] += 1;
        self.pending[slot] = false;
    }

    /// True if `ticket` is the newest of its kind. Accepting it ends the load.
    pub fn accept(&mut self, ticket: Ticket) -> bool {
        let slot = ticket.kind.slot();
        if self.generations[slot] != ticket.generation {
            return false;
        }
        self.pending[slot] = false;
        true
    }

    pub fn is_pending(&self, kind: LoadKind) -> bool {
        self.pending[kind.slot()]
    }

    pub fn any_pending(&self) -> bool {
        LoadKind::ALL.iter().any(|kind| self.is_pending(*kind))
    }
}
