//! Selectable list model backing each list box.

use std::collections::HashSet;

/// Stable identity of a row, assigned on insertion and never reused
/// within one list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowId(u64);

#[derive(Debug, Clone)]
pub struct Row<T> {
    pub id: RowId,
    pub value: T,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    Single,
    Multi,
}

#[derive(Debug, Clone)]
pub struct SelectableList<T> {
    rows: Vec<Row<T>>,
    selected: HashSet<RowId>,
    mode: SelectionMode,
    next_id: u64,
}

impl<T> SelectableList<T> {
    pub fn new(mode: SelectionMode) -> Self {
        Self {
            rows: Vec::new(),
            selected: HashSet::new(),
            mode,
            next_id: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Row<T>] {
        &self.rows
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.rows.iter().map(|row| &row.value)
    }

    pub fn get(&self, index: usize) -> Option<&Row<T>> {
        self.rows.get(index)
    }

    pub fn push(&mut self, value: T) -> RowId {
        let id = RowId(self.next_id);
        self.next_id += 1;
        self.rows.push(Row { id, value });
        id
    }

    /// Clear, then repopulate in iteration order. Selection is dropped.
    pub fn replace(&mut self, values: impl IntoIterator<Item = T>) {
        self.clear();
        for value in values {
            self.push(value);
        }
    }

    pub fn clear(&mut self) {
        self.rows.clear();
        self.selected.clear();
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    pub fn is_selected(&self, id: RowId) -> bool {
        self.selected.contains(&id)
    }

    /// Select the row at `index`. In single mode this replaces the selection.
    pub fn select_index(&mut self, index: usize) -> Option<RowId> {
        let id = self.rows.get(index)?.id;
        if self.mode == SelectionMode::Single {
            self.selected.clear();
        }
        self.selected.insert(id);
        Some(id)
    }

    /// Flip the row at `index`. Single mode behaves like `select_index`.
    pub fn toggle_index(&mut self, index: usize) -> Option<RowId> {
        let id = self.rows.get(index)?.id;
        if self.mode == SelectionMode::Multi && self.selected.remove(&id) {
            return Some(id);
        }
        self.select_index(index)
    }

    pub fn selection_count(&self) -> usize {
        self.selected.len()
    }

    /// Selected rows in list order.
    pub fn selected_rows(&self) -> impl Iterator<Item = &Row<T>> {
        self.rows.iter().filter(|row| self.selected.contains(&row.id))
    }

    pub fn selected_values(&self) -> impl Iterator<Item = &T> {
        self.selected_rows().map(|row| &row.value)
    }

    // ------------------------------------------------------------------
    // Removal
    // ------------------------------------------------------------------

    /// Remove every selected row. Returns the removed values in list order.
    pub fn remove_selected(&mut self) -> Vec<T> {
        let ids = std::mem::take(&mut self.selected);
        self.remove_ids(&ids)
    }

    /// Remove the rows currently at `indices`.
    ///
    /// Indices are resolved to row ids before anything is removed, so the
    /// result does not depend on the order of `indices`.
    pub fn remove_indices(&mut self, indices: &[usize]) -> Vec<T> {
        let ids: HashSet<RowId> = indices
            .iter()
            .filter_map(|&index| self.rows.get(index).map(|row| row.id))
            .collect();
        self.remove_ids(&ids)
    }

    fn remove_ids(&mut self, ids: &HashSet<RowId>) -> Vec<T> {
        if ids.is_empty() {
            return Vec::new();
        }
        let (removed, kept): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.rows).into_iter().partition(|row| ids.contains(&row.id));
        self.rows = kept;
        self.selected.retain(|id| !ids.contains(id));
        removed.into_iter().map(|row| row.value).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn letters(mode: SelectionMode) -> SelectableList<&'static str> {
        let mut list = SelectableList::new(mode);
        list.replace(["a", "b", "c", "d", "e"]);
        list
    }

    fn contents(list: &SelectableList<&'static str>) -> Vec<&'static str> {
        list.values().copied().collect()
    }

    #[test]
    fn test_remove_indices_keeps_unselected_rows() {
        let mut list = letters(SelectionMode::Multi);
        let removed = list.remove_indices(&[1, 3]);
        assert_eq!(removed, vec!["b", "d"]);
        assert_eq!(contents(&list), vec!["a", "c", "e"]);
    }

    #[test]
    fn test_remove_indices_order_does_not_matter() {
        let mut list = letters(SelectionMode::Multi);
        list.remove_indices(&[3, 1, 3]);
        assert_eq!(contents(&list), vec!["a", "c", "e"]);
    }

    #[test]
    fn test_remove_selected_by_identity() {
        let mut list = letters(SelectionMode::Multi);
        list.toggle_index(1);
        list.toggle_index(3);
        list.toggle_index(4);
        list.toggle_index(4);

        assert_eq!(list.selection_count(), 2);
        assert_eq!(list.remove_selected(), vec!["b", "d"]);
        assert_eq!(contents(&list), vec!["a", "c", "e"]);
        assert_eq!(list.selection_count(), 0);
    }

    #[test]
    fn test_duplicate_values_keep_distinct_ids() {
        let mut list = SelectableList::new(SelectionMode::Multi);
        let first = list.push("x");
        let second = list.push("x");
        assert_ne!(first, second);

        list.select_index(1);
        list.remove_selected();
        assert_eq!(list.len(), 1);
        assert_eq!(list.get(0).map(|row| row.id), Some(first));
    }

    #[test]
    fn test_single_mode_replaces_selection() {
        let mut list = letters(SelectionMode::Single);
        list.select_index(0);
        list.toggle_index(2);
        let selected: Vec<_> = list.selected_values().copied().collect();
        assert_eq!(selected, vec!["c"]);
    }

    #[test]
    fn test_replace_drops_selection_and_keeps_order() {
        let mut list = letters(SelectionMode::Multi);
        list.select_index(0);
        list.replace(["z", "y"]);
        assert_eq!(contents(&list), vec!["z", "y"]);
        assert_eq!(list.selection_count(), 0);
        assert!(list.select_index(5).is_none());
    }
}
