//! Borrowed views over decoded and converted pictures.
//!
//! Library frames hand out each plane as one byte slice plus a stride (row
//! length in memory, often padded past the visible width). `PlaneView` pairs
//! the two and yields only the meaningful bytes of each row.

/// A picture made of one or more byte planes.
pub trait Picture {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn planes(&self) -> usize;
    fn data(&self, plane: usize) -> &[u8];
    fn stride(&self, plane: usize) -> usize;
}

#[derive(Debug, Clone, Copy)]
pub struct PlaneView<'a> {
    data: &'a [u8],
    stride: usize,
    row_bytes: usize,
    rows: usize,
}

impl<'a> PlaneView<'a> {
    /// Returns `None` when `data` is too short for `rows` rows of `stride`
    /// bytes, or when a row would be wider than the stride.
    pub fn new(data: &'a [u8], stride: usize, row_bytes: usize, rows: usize) -> Option<Self> {
        if row_bytes > stride && rows > 1 {
            return None;
        }
        let needed = match rows {
            0 => 0,
            n => stride * (n - 1) + row_bytes,
        };
        if data.len() < needed {
            return None;
        }
        Some(Self {
            data,
            stride,
            row_bytes,
            rows,
        })
    }

    pub fn of<P: Picture + ?Sized>(
        picture: &'a P,
        plane: usize,
        row_bytes: usize,
        rows: usize,
    ) -> Option<Self> {
        if plane >= picture.planes() {
            return None;
        }
        Self::new(picture.data(plane), picture.stride(plane), row_bytes, rows)
    }

    pub fn row(&self, y: usize) -> &'a [u8] {
        let start = y * self.stride;
        &self.data[start..start + self.row_bytes]
    }

    pub fn rows(&self) -> impl Iterator<Item = &'a [u8]> + '_ {
        (0..self.rows).map(move |y| self.row(y))
    }

    pub fn height(&self) -> usize {
        self.rows
    }

    pub fn row_bytes(&self) -> usize {
        self.row_bytes
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.data.as_ptr()
    }

    /// Length of the underlying slice, padding included.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Copies the visible rows into a buffer without row padding.
    pub fn packed(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.row_bytes * self.rows);
        for row in self.rows() {
            out.extend_from_slice(row);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_skip_padding() {
        // 2 rows, 3 visible bytes, stride 5
        let data = [1, 2, 3, 0, 0, 4, 5, 6, 0, 0];
        let view = PlaneView::new(&data, 5, 3, 2).unwrap();
        let rows: Vec<&[u8]> = view.rows().collect();
        assert_eq!(rows, vec![&[1, 2, 3][..], &[4, 5, 6][..]]);
        assert_eq!(view.packed(), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn last_row_may_omit_padding() {
        let data = [1, 2, 3, 0, 4, 5, 6];
        let view = PlaneView::new(&data, 4, 3, 2).unwrap();
        assert_eq!(view.row(1), &[4, 5, 6]);
    }

    #[test]
    fn rejects_short_data() {
        let data = [0u8; 9];
        assert!(PlaneView::new(&data, 5, 3, 2).is_some());
        assert!(PlaneView::new(&data[..7], 5, 3, 2).is_none());
        assert!(PlaneView::new(&data, 2, 3, 2).is_none());
    }

    #[test]
    fn raw_parts_round_trip() {
        let data = vec![7u8; 48];
        let view = PlaneView::new(&data, 16, 12, 3).unwrap();
        let (ptr, len) = (view.as_ptr(), view.len());
        assert_eq!(ptr, data.as_ptr());
        assert_eq!(len, data.len());

        let back = unsafe { std::slice::from_raw_parts(ptr, len) };
        let again = PlaneView::new(back, view.stride(), view.row_bytes(), view.height()).unwrap();
        assert_eq!(again.as_ptr(), data.as_ptr());
        assert_eq!(again.len(), 48);
    }
}
