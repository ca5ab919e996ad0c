//! Table reconciliation: pairing, shape changes, and cell recursion.

use crate::emit::{Emitter, SegmentCtx};
use crate::error::{ReconcileError, Result};
use crate::segment::{Walk, reconcile_elements};
use extrasuite_docs_types::table::Table;
use extrasuite_docs_types::{
    DeleteTableColumnRequest, DeleteTableRowRequest, InsertTableColumnRequest,
    InsertTableRowRequest, Location, Request, Segment, SegmentId, StructuralElement,
    TableCellLocation,
};

fn cell_location(ctx: SegmentCtx<'_>, table_start: usize, row: usize, column: usize) -> TableCellLocation {
    TableCellLocation {
        table_start_location: Location {
            segment_id: ctx.segment_id.map(str::to_string),
            tab_id: ctx.tab_id.map(str::to_string),
            index: table_start,
        },
        row_index: row,
        column_index: column,
    }
}

/// Style-only recursion into a content-equal table pair.
pub(crate) fn equal_table(
    em: &mut Emitter,
    walk: &mut Walk,
    ctx: SegmentCtx<'_>,
    base: &Table,
    desired: &Table,
    shift: isize,
) -> Result<()> {
    for (brow, drow) in base.rows.iter().zip(&desired.rows) {
        for (bcell, dcell) in brow.cells.iter().zip(&drow.cells) {
            if bcell.style != dcell.style {
                return Err(ReconcileError::unsupported(
                    "table cell styles cannot be changed",
                ));
            }
            reconcile_elements(em, walk, ctx, &bcell.content, &dcell.content, shift)?;
        }
    }
    Ok(())
}

/// Reconcile a base table into a desired table: shape first (row and
/// column ordinals, deletes from the end downward), then each common
/// cell's content in ascending order at final-state indices.
///
/// By the time this item's requests run, everything before the table is
/// already in final form, so the desired document's own index is the
/// table's current position.
pub(crate) fn emit_table_pair(
    em: &mut Emitter,
    walk: &mut Walk,
    ctx: SegmentCtx<'_>,
    base: &Table,
    desired: &Table,
) -> Result<()> {
    let table_start = desired.start_index;

    let b_rows = base.rows.len();
    let d_rows = desired.rows.len();
    for r in (d_rows..b_rows).rev() {
        em.push(Request::DeleteTableRow(DeleteTableRowRequest {
            table_cell_location: cell_location(ctx, table_start, r, 0),
        }));
    }
    for r in b_rows..d_rows {
        em.push(Request::InsertTableRow(InsertTableRowRequest {
            table_cell_location: cell_location(ctx, table_start, r - 1, 0),
            insert_below: true,
        }));
    }

    let b_cols = base.column_count();
    let d_cols = desired.column_count();
    for c in (d_cols..b_cols).rev() {
        em.push(Request::DeleteTableColumn(DeleteTableColumnRequest {
            table_cell_location: cell_location(ctx, table_start, 0, c),
        }));
    }
    for c in b_cols..d_cols {
        em.push(Request::InsertTableColumn(InsertTableColumnRequest {
            table_cell_location: cell_location(ctx, table_start, 0, c - 1),
            insert_right: true,
        }));
    }

    // The table's state after the shape requests, indexed relative to
    // the table start.
    let mut sim = base.clone();
    sim.rows.truncate(d_rows);
    while sim.rows.len() < d_rows {
        sim.rows.push(extrasuite_docs_types::TableRow {
            start_index: 0,
            end_index: 0,
            cells: (0..b_cols)
                .map(|_| extrasuite_docs_types::TableCell::empty())
                .collect(),
        });
    }
    for row in &mut sim.rows {
        row.cells.truncate(d_cols);
        while row.cells.len() < d_cols {
            row.cells.push(extrasuite_docs_types::TableCell::empty());
        }
    }
    recurse_cells(em, walk, ctx, sim, desired, table_start)
}

/// Insert a new table and populate its cells.
pub(crate) fn emit_table_insert(
    em: &mut Emitter,
    walk: &mut Walk,
    ctx: SegmentCtx<'_>,
    desired: &Table,
) -> Result<()> {
    let q = desired.start_index;
    let rows = desired.rows.len();
    let columns = desired.column_count();
    em.insert_table(ctx, q, rows, columns);
    recurse_cells(em, walk, ctx, Table::empty(rows, columns), desired, q)
}

fn recurse_cells(
    em: &mut Emitter,
    walk: &mut Walk,
    ctx: SegmentCtx<'_>,
    sim: Table,
    desired: &Table,
    table_start: usize,
) -> Result<()> {
    let mut scratch = Segment {
        id: SegmentId::Body,
        content: vec![StructuralElement::Table(sim)],
    };
    scratch.reindex();
    let StructuralElement::Table(sim) = &scratch.content[0] else {
        unreachable!()
    };

    let mut tshift = table_start as isize;
    for (sim_row, d_row) in sim.rows.iter().zip(&desired.rows) {
        for (sim_cell, d_cell) in sim_row.cells.iter().zip(&d_row.cells) {
            if sim_cell.style != d_cell.style {
                return Err(ReconcileError::unsupported(
                    "table cell styles cannot be changed",
                ));
            }
            reconcile_elements(em, walk, ctx, &sim_cell.content, &d_cell.content, tshift)?;
            let sim_len = sim_cell.end_index - sim_cell.start_index;
            let d_len = d_cell.end_index - d_cell.start_index;
            tshift += d_len as isize - sim_len as isize;
        }
    }
    Ok(())
}
