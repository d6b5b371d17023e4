// Small float helpers shared by Affine2D and Matrix3D.

use std::fmt;

use crate::tolerance::Tolerance;

#[inline]
pub fn det2(a: f64, b: f64, c: f64, d: f64) -> f64 {
    a * d - b * c
}

/// Determinant of a row-major 3x3 matrix, expanded along the first row.
#[inline]
pub fn det3(m: &[[f64; 3]; 3]) -> f64 {
    m[0][0] * det2(m[1][1], m[1][2], m[2][1], m[2][2])
        - m[0][1] * det2(m[1][0], m[1][2], m[2][0], m[2][2])
        + m[0][2] * det2(m[1][0], m[1][1], m[2][0], m[2][1])
}

/// Hadamard bound: the product of the row lengths, an upper limit on the
/// magnitude of the determinant. Used to scale the singularity tolerance.
pub fn row_norm_product(rows: &[&[f64]]) -> f64 {
    rows.iter()
        .map(|row| row.iter().map(|v| v * v).sum::<f64>().sqrt())
        .product()
}

/// Returns `1 / det`, or `None` when `det` is within tolerance of zero.
#[inline]
pub fn checked_recip(det: f64, scale: f64, tol: &Tolerance) -> Option<f64> {
    if tol.is_singular(det, scale) {
        None
    } else {
        Some(1.0 / det)
    }
}

/// Copies `len` values into `target` if it already has that length,
/// otherwise into a freshly allocated buffer.
pub(crate) fn reuse_or_alloc(target: Option<Vec<f64>>, len: usize) -> Vec<f64> {
    match target {
        Some(buf) if buf.len() == len => buf,
        _ => vec![0.0; len],
    }
}

/// Writes one bracketed line per row, columns right-aligned to a common width.
pub(crate) fn write_rows<const C: usize>(f: &mut fmt::Formatter<'_>, rows: &[[f64; C]]) -> fmt::Result {
    // -0.0 prints as "0.0000"
    let cells: Vec<[String; C]> = rows
        .iter()
        .map(|row| row.map(|v| format!("{:.4}", if v == 0.0 { 0.0 } else { v })))
        .collect();
    let width = cells.iter().flatten().map(|s| s.len()).max().unwrap_or(0);

    for row in &cells {
        f.write_str("[")?;
        for cell in row {
            write!(f, " {cell:>width$}")?;
        }
        writeln!(f, " ]")?;
    }
    Ok(())
}
