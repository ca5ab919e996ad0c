//! `insertTable` and the row/column operations.

use crate::error::{MockError, Result};
use crate::text::check_insert_index;
use extrasuite_docs_types::table::{Table, TableCell, TableRow};
use extrasuite_docs_types::{Segment, StructuralElement};

/// Find the element list directly containing the paragraph that covers
/// `index`, along with the paragraph's position in it.
fn locate_list_mut(
    elements: &mut Vec<StructuralElement>,
    index: usize,
) -> Option<(&mut Vec<StructuralElement>, usize)> {
    let pos = elements
        .iter()
        .position(|el| el.start_index() <= index && index < el.end_index())?;
    if matches!(elements[pos], StructuralElement::Paragraph(_)) {
        return Some((elements, pos));
    }
    let StructuralElement::Table(t) = &mut elements[pos] else {
        return None;
    };
    for row in &mut t.rows {
        for cell in &mut row.cells {
            if cell.start_index < index && index < cell.end_index {
                return locate_list_mut(&mut cell.content, index);
            }
        }
    }
    None
}

/// Find the list containing a table whose `startIndex` is exactly
/// `start`, with the table's position in it. Descends into cells for
/// nested tables.
fn find_table_list_mut(
    elements: &mut Vec<StructuralElement>,
    start: usize,
) -> Option<(&mut Vec<StructuralElement>, usize)> {
    let direct = elements.iter().position(
        |el| matches!(el, StructuralElement::Table(t) if t.start_index == start),
    );
    if let Some(pos) = direct {
        return Some((elements, pos));
    }
    let covering = elements
        .iter()
        .position(|el| el.start_index() <= start && start < el.end_index())?;
    let StructuralElement::Table(t) = &mut elements[covering] else {
        return None;
    };
    for row in &mut t.rows {
        for cell in &mut row.cells {
            if cell.start_index < start && start < cell.end_index {
                return find_table_list_mut(&mut cell.content, start);
            }
        }
    }
    None
}

/// Insert an empty R×C table at `index`, which must be the start of an
/// existing paragraph; the table lands immediately before it. The
/// following paragraph keeps every table followed by a paragraph.
pub(crate) fn insert_table(
    segment: &mut Segment,
    index: usize,
    rows: usize,
    columns: usize,
) -> Result<()> {
    const KIND: &str = "insertTable";
    if rows == 0 || columns == 0 {
        return Err(MockError::invalid(KIND, "table must have rows and columns"));
    }
    check_insert_index(segment, index, KIND)?;
    let Some((list, pos)) = locate_list_mut(&mut segment.content, index) else {
        return Err(MockError::invalid(
            KIND,
            format!("index {index} does not address text content"),
        ));
    };
    if list[pos].start_index() != index {
        return Err(MockError::invalid(
            KIND,
            format!("index {index} is not a paragraph boundary"),
        ));
    }
    list.insert(pos, StructuralElement::Table(Table::empty(rows, columns)));
    Ok(())
}

fn located_table<'a>(
    segment: &'a mut Segment,
    table_start: usize,
    kind: &'static str,
) -> Result<(&'a mut Vec<StructuralElement>, usize)> {
    find_table_list_mut(&mut segment.content, table_start).ok_or_else(|| {
        MockError::invalid(kind, format!("no table starts at index {table_start}"))
    })
}

pub(crate) fn insert_table_row(
    segment: &mut Segment,
    table_start: usize,
    row_index: usize,
    insert_below: bool,
) -> Result<()> {
    const KIND: &str = "insertTableRow";
    let (list, pos) = located_table(segment, table_start, KIND)?;
    let StructuralElement::Table(t) = &mut list[pos] else {
        unreachable!()
    };
    if row_index >= t.rows.len() {
        return Err(MockError::invalid(
            KIND,
            format!("row {row_index} out of range for {} rows", t.rows.len()),
        ));
    }
    let columns = t.column_count();
    let at = if insert_below { row_index + 1 } else { row_index };
    t.rows.insert(
        at,
        TableRow {
            start_index: 0,
            end_index: 0,
            cells: (0..columns).map(|_| TableCell::empty()).collect(),
        },
    );
    Ok(())
}

pub(crate) fn insert_table_column(
    segment: &mut Segment,
    table_start: usize,
    column_index: usize,
    insert_right: bool,
) -> Result<()> {
    const KIND: &str = "insertTableColumn";
    let (list, pos) = located_table(segment, table_start, KIND)?;
    let StructuralElement::Table(t) = &mut list[pos] else {
        unreachable!()
    };
    if column_index >= t.column_count() {
        return Err(MockError::invalid(
            KIND,
            format!(
                "column {column_index} out of range for {} columns",
                t.column_count()
            ),
        ));
    }
    let at = if insert_right {
        column_index + 1
    } else {
        column_index
    };
    for row in &mut t.rows {
        row.cells.insert(at, TableCell::empty());
    }
    Ok(())
}

pub(crate) fn delete_table_row(segment: &mut Segment, table_start: usize, row_index: usize) -> Result<()> {
    const KIND: &str = "deleteTableRow";
    let (list, pos) = located_table(segment, table_start, KIND)?;
    let StructuralElement::Table(t) = &mut list[pos] else {
        unreachable!()
    };
    if row_index >= t.rows.len() {
        return Err(MockError::invalid(
            KIND,
            format!("row {row_index} out of range for {} rows", t.rows.len()),
        ));
    }
    t.rows.remove(row_index);
    if t.rows.is_empty() {
        // Deleting the last row deletes the table.
        list.remove(pos);
    }
    Ok(())
}

pub(crate) fn delete_table_column(
    segment: &mut Segment,
    table_start: usize,
    column_index: usize,
) -> Result<()> {
    const KIND: &str = "deleteTableColumn";
    let (list, pos) = located_table(segment, table_start, KIND)?;
    let StructuralElement::Table(t) = &mut list[pos] else {
        unreachable!()
    };
    if column_index >= t.column_count() {
        return Err(MockError::invalid(
            KIND,
            format!(
                "column {column_index} out of range for {} columns",
                t.column_count()
            ),
        ));
    }
    for row in &mut t.rows {
        row.cells.remove(column_index);
    }
    if t.column_count() == 0 {
        list.remove(pos);
    }
    Ok(())
}
