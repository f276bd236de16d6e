// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Scanline filters (None, Sub, Up, Average, Paeth).
//!
//! Every scanline of decompressed IDAT data starts with a filter-type byte
//! followed by `stride` filtered bytes. Reconstruction of a row needs only
//! that row and the already reconstructed row above it, so the whole image
//! is undone in one forward pass carrying a single row of state.
//!
//! Predictors work on bytes, not pixels: `left` is the byte `bpp` positions
//! back, `up` the byte at the same position in the previous row, `upleft`
//! the byte `bpp` back in the previous row. Missing neighbours read as 0.

use super::error::{PngError, Result};

/// Scanline filter type (the leading byte of each row).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FilterType {
    None = 0,
    Sub = 1,
    Up = 2,
    Average = 3,
    Paeth = 4,
}

impl FilterType {
    pub const ALL: [FilterType; 5] = [
        FilterType::None,
        FilterType::Sub,
        FilterType::Up,
        FilterType::Average,
        FilterType::Paeth,
    ];
}

impl TryFrom<u8> for FilterType {
    type Error = PngError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::None),
            1 => Ok(Self::Sub),
            2 => Ok(Self::Up),
            3 => Ok(Self::Average),
            4 => Ok(Self::Paeth),
            other => Err(PngError::UnknownFilterSelector(other)),
        }
    }
}

/// How to pick a filter per row when re-encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterStrategy {
    /// Same filter for every row.
    Fixed(FilterType),
    /// Per row, the filter with the smallest sum of absolute signed
    /// residuals (the usual encoder heuristic).
    Adaptive,
}

impl Default for FilterStrategy {
    fn default() -> Self {
        Self::Adaptive
    }
}

/// Paeth predictor: whichever of left, up, upleft is closest to
/// `left + up - upleft`, ties resolved in that order.
#[inline]
pub fn paeth_predictor(left: u8, up: u8, upleft: u8) -> u8 {
    let p = left as i16 + up as i16 - upleft as i16;
    let pa = (p - left as i16).abs();
    let pb = (p - up as i16).abs();
    let pc = (p - upleft as i16).abs();
    if pa <= pb && pa <= pc {
        left
    } else if pb <= pc {
        up
    } else {
        upleft
    }
}

/// Reverse one scanline's filter.
///
/// `selector` is the row's filter-type byte; `previous` is the
/// reconstructed row above (`None` for the first row).
pub fn undo_filter(selector: u8, filtered: &[u8], previous: Option<&[u8]>, bpp: usize) -> Result<Vec<u8>> {
    let filter = FilterType::try_from(selector)?;
    let mut line = filtered.to_vec();
    unfilter_in_place(filter, &mut line, previous, bpp);
    Ok(line)
}

/// Apply a filter to one raw scanline. Exact inverse of [`undo_filter`].
pub fn apply_filter(filter: FilterType, raw: &[u8], previous: Option<&[u8]>, bpp: usize) -> Vec<u8> {
    let mut out = vec![0u8; raw.len()];
    filter_into(filter, raw, previous, bpp, &mut out);
    out
}

fn unfilter_in_place(filter: FilterType, line: &mut [u8], previous: Option<&[u8]>, bpp: usize) {
    debug_assert!(bpp >= 1);
    debug_assert!(previous.map_or(true, |p| p.len() == line.len()));
    let up = |i: usize| previous.map_or(0, |p| p[i]);

    match filter {
        FilterType::None => {}
        FilterType::Sub => {
            for i in bpp..line.len() {
                line[i] = line[i].wrapping_add(line[i - bpp]);
            }
        }
        FilterType::Up => {
            if let Some(prev) = previous {
                for (x, &b) in line.iter_mut().zip(prev) {
                    *x = x.wrapping_add(b);
                }
            }
        }
        FilterType::Average => {
            for i in 0..line.len() {
                let left = if i >= bpp { line[i - bpp] } else { 0 };
                let avg = ((left as u16 + up(i) as u16) / 2) as u8;
                line[i] = line[i].wrapping_add(avg);
            }
        }
        FilterType::Paeth => {
            for i in 0..line.len() {
                let (left, upleft) = if i >= bpp { (line[i - bpp], up(i - bpp)) } else { (0, 0) };
                line[i] = line[i].wrapping_add(paeth_predictor(left, up(i), upleft));
            }
        }
    }
}

fn filter_into(filter: FilterType, raw: &[u8], previous: Option<&[u8]>, bpp: usize, out: &mut [u8]) {
    debug_assert_eq!(raw.len(), out.len());
    let up = |i: usize| previous.map_or(0, |p| p[i]);
    let left = |i: usize| if i >= bpp { raw[i - bpp] } else { 0 };

    for i in 0..raw.len() {
        let predicted = match filter {
            FilterType::None => 0,
            FilterType::Sub => left(i),
            FilterType::Up => up(i),
            FilterType::Average => ((left(i) as u16 + up(i) as u16) / 2) as u8,
            FilterType::Paeth => {
                let upleft = if i >= bpp { up(i - bpp) } else { 0 };
                paeth_predictor(left(i), up(i), upleft)
            }
        };
        out[i] = raw[i].wrapping_sub(predicted);
    }
}

/// Number of whole scanlines in a filtered buffer. Fails unless the length
/// is an exact multiple of `stride + 1`.
pub fn count_scanlines(filtered_len: usize, stride: usize) -> Result<usize> {
    let row = stride.checked_add(1).ok_or(PngError::InvalidHeader("image too large"))?;
    if filtered_len % row != 0 {
        return Err(PngError::ScanlineSizeMismatch {
            expected: filtered_len.div_ceil(row) * row,
            actual: filtered_len,
        });
    }
    Ok(filtered_len / row)
}

/// Reconstruct `rows` scanlines of raw pixel bytes from decompressed IDAT
/// data. Returns `rows * stride` bytes. Data beyond the last row is ignored.
pub fn unfilter_scanlines(filtered: &[u8], stride: usize, bpp: usize, rows: usize) -> Result<Vec<u8>> {
    let expected = stride
        .checked_add(1)
        .and_then(|row| row.checked_mul(rows))
        .ok_or(PngError::InvalidHeader("image too large"))?;
    if filtered.len() < expected {
        return Err(PngError::ScanlineSizeMismatch { expected, actual: filtered.len() });
    }
    if filtered.len() > expected {
        tracing::warn!(extra = filtered.len() - expected, "ignoring data after the last scanline");
    }

    let mut raw = vec![0u8; rows * stride];
    for (row, src) in filtered[..expected].chunks_exact(stride + 1).enumerate() {
        let filter = FilterType::try_from(src[0])?;
        let (done, rest) = raw.split_at_mut(row * stride);
        let line = &mut rest[..stride];
        line.copy_from_slice(&src[1..]);
        let previous = if row > 0 { Some(&done[(row - 1) * stride..]) } else { None };
        unfilter_in_place(filter, line, previous, bpp);
    }
    Ok(raw)
}

/// Filter raw pixel rows for compression. `raw.len()` must be a multiple
/// of `stride`; returns `rows * (stride + 1)` bytes.
pub fn filter_scanlines(raw: &[u8], stride: usize, bpp: usize, strategy: FilterStrategy) -> Vec<u8> {
    debug_assert!(stride > 0 && raw.len() % stride == 0);
    let rows = raw.len() / stride;
    let mut out = Vec::with_capacity(rows * (stride + 1));
    let mut scratch = vec![0u8; stride];
    let mut best = vec![0u8; stride];

    for (row, line) in raw.chunks_exact(stride).enumerate() {
        let previous = if row > 0 { Some(&raw[(row - 1) * stride..row * stride]) } else { None };
        let chosen = match strategy {
            FilterStrategy::Fixed(filter) => {
                filter_into(filter, line, previous, bpp, &mut best);
                filter
            }
            FilterStrategy::Adaptive => {
                let mut chosen = FilterType::None;
                let mut best_score = u64::MAX;
                for filter in FilterType::ALL {
                    filter_into(filter, line, previous, bpp, &mut scratch);
                    let score = residual_score(&scratch);
                    if score < best_score {
                        best_score = score;
                        chosen = filter;
                        best.copy_from_slice(&scratch);
                    }
                }
                chosen
            }
        };
        out.push(chosen as u8);
        out.extend_from_slice(&best);
    }
    out
}

fn residual_score(line: &[u8]) -> u64 {
    line.iter().map(|&b| (b as i8).unsigned_abs() as u64).sum()
}
