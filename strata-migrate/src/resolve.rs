//! Foreign-key dependency ordering.
//!
//! Tables are created parents-first and dropped children-first. The drop
//! order is always the reverse of the creation order returned by
//! [`topo_sort`], never a second sort.

use std::collections::HashMap;

use strata_schema::Table;

use crate::diff::TableDiff;
use crate::error::{MigrateResult, MigrationError};

/// Something with a name that may reference other named things.
pub trait Dependent {
    /// Name used to resolve references. Compared case-insensitively.
    fn name(&self) -> &str;

    /// Names this item references, in declaration order.
    fn dependencies(&self) -> Vec<&str>;
}

impl Dependent for Table {
    fn name(&self) -> &str {
        &self.name
    }

    fn dependencies(&self) -> Vec<&str> {
        self.foreign_keys
            .iter()
            .map(|fk| fk.referenced_table.as_str())
            .collect()
    }
}

impl Dependent for TableDiff {
    fn name(&self) -> &str {
        &self.table.name
    }

    fn dependencies(&self) -> Vec<&str> {
        self.foreign_keys_to_add
            .iter()
            .map(|fk| fk.referenced_table.as_str())
            .collect()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Done,
}

/// Order items so every referenced item comes before the items referencing it.
///
/// Self-references and references to names outside `items` impose no
/// ordering. Otherwise input order is kept. A cycle fails with
/// [`MigrationError::Dependency`] naming a table on the cycle.
pub fn topo_sort<T: Dependent + Clone>(items: &[T]) -> MigrateResult<Vec<T>> {
    let positions: HashMap<String, usize> = items
        .iter()
        .enumerate()
        .map(|(i, item)| (item.name().to_lowercase(), i))
        .collect();

    let mut marks = vec![Mark::Unvisited; items.len()];
    let mut order = Vec::with_capacity(items.len());

    for i in 0..items.len() {
        visit(i, items, &positions, &mut marks, &mut order)?;
    }

    Ok(order.into_iter().map(|i| items[i].clone()).collect())
}

fn visit<T: Dependent>(
    i: usize,
    items: &[T],
    positions: &HashMap<String, usize>,
    marks: &mut [Mark],
    order: &mut Vec<usize>,
) -> MigrateResult<()> {
    match marks[i] {
        Mark::Done => return Ok(()),
        Mark::Visiting => return Err(MigrationError::dependency(items[i].name())),
        Mark::Unvisited => {}
    }

    marks[i] = Mark::Visiting;
    for dep in items[i].dependencies() {
        if let Some(&j) = positions.get(&dep.to_lowercase())
            && j != i
        {
            visit(j, items, positions, marks, order)?;
        }
    }
    marks[i] = Mark::Done;
    order.push(i);
    Ok(())
}

/// The drop order for a creation order: its exact reverse.
pub fn reverse_order<T: Clone>(sorted: &[T]) -> Vec<T> {
    sorted.iter().rev().cloned().collect()
}
