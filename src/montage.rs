//! Grid assembly of composited tiles.

use image::{RgbImage, imageops};

/// Places `rows[r][c]` into a grid. Each cell is as wide as the widest tile
/// in its column and as tall as the tallest tile in its row; tiles are
/// centred in their cell on a black background. With `axis_row` the grid is
/// transposed, so every input row becomes a column.
pub fn assemble(rows: Vec<Vec<RgbImage>>, axis_row: bool) -> RgbImage {
    let rows = if axis_row { transpose(rows) } else { rows };
    let column_count = rows.iter().map(Vec::len).max().unwrap_or(0);

    let column_widths: Vec<u32> = (0..column_count)
        .map(|column| {
            rows.iter()
                .filter_map(|row| row.get(column))
                .map(RgbImage::width)
                .max()
                .unwrap_or(0)
        })
        .collect();
    let row_heights: Vec<u32> = rows
        .iter()
        .map(|row| row.iter().map(RgbImage::height).max().unwrap_or(0))
        .collect();

    let mut canvas = RgbImage::new(column_widths.iter().sum(), row_heights.iter().sum());
    let mut top = 0;
    for (row, row_height) in rows.iter().zip(&row_heights) {
        let mut left = 0;
        for (tile, column_width) in row.iter().zip(&column_widths) {
            let x = left + (column_width - tile.width()) / 2;
            let y = top + (row_height - tile.height()) / 2;
            imageops::replace(&mut canvas, tile, x as i64, y as i64);
            left += column_width;
        }
        top += row_height;
    }
    canvas
}

fn transpose(rows: Vec<Vec<RgbImage>>) -> Vec<Vec<RgbImage>> {
    let column_count = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut columns: Vec<Vec<RgbImage>> = (0..column_count).map(|_| Vec::new()).collect();
    for row in rows {
        for (column, tile) in columns.iter_mut().zip(row) {
            column.push(tile);
        }
    }
    columns
}
