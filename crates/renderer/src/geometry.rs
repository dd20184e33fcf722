//! Grid mesh generation for the photo planes.
//!
//! The square `[-1, 1]²` is cut into `divisions × divisions` cells, each made of
//! two triangles. Every vertex carries the cell's row and column so the tearing
//! shader can displace whole strips coherently. A positive `gap` pulls each
//! cell's right and bottom edges inward, leaving visible seams between pieces;
//! texture coordinates ignore the gap so the photo still lines up across cells.

use bytemuck::{Pod, Zeroable};

use crate::error::RenderError;

/// Grid resolution used for every mesh in the scene.
pub const GRID_DIVISIONS: u32 = 10;
/// Inward shrink applied to the torn mesh's cells.
pub const TEAR_GAP: f32 = 0.03;
/// Depth written into every generated vertex.
pub const MESH_Z: f32 = 1.0;

const VERTICES_PER_CELL: usize = 6;

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub tex_coord: [f32; 2],
    pub row_index: f32,
    pub col_index: f32,
}

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
    0 => Float32x3,
    1 => Float32x2,
    2 => Float32,
    3 => Float32,
];

impl Vertex {
    /// Layout shared by every program: seven tightly packed floats.
    pub fn buffer_layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &VERTEX_ATTRIBUTES,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Mesh {
    vertices: Vec<Vertex>,
    divisions: u32,
}

impl Mesh {
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertices.len() as u32
    }

    /// The six vertices of the cell at column `col`, row `row`.
    pub fn cell(&self, col: u32, row: u32) -> Option<&[Vertex]> {
        if col >= self.divisions || row >= self.divisions {
            return None;
        }
        // Columns form the outer loop of generation.
        let start = (col as usize * self.divisions as usize + row as usize) * VERTICES_PER_CELL;
        self.vertices.get(start..start + VERTICES_PER_CELL)
    }
}

/// Builds a `divisions × divisions` grid over `[-1, 1]²`.
pub fn generate_mesh(divisions: u32, gap: f32) -> Result<Mesh, RenderError> {
    if divisions == 0 {
        return Err(RenderError::InvalidMesh(
            "grid needs at least one division".into(),
        ));
    }
    if !gap.is_finite() || gap < 0.0 {
        return Err(RenderError::InvalidMesh(format!(
            "gap must be a non-negative finite number, got {gap}"
        )));
    }
    let step = 1.0 / divisions as f32;
    let cell_extent = 2.0 * step;
    if gap >= cell_extent {
        return Err(RenderError::InvalidMesh(format!(
            "gap {gap} would collapse cells of width {cell_extent}"
        )));
    }

    let cells = divisions as usize * divisions as usize;
    let mut vertices = Vec::with_capacity(cells * VERTICES_PER_CELL);

    for i in 0..divisions {
        for j in 0..divisions {
            let (fi, fj) = (i as f32, j as f32);
            let x1 = -1.0 + cell_extent * fi;
            let x2 = -1.0 + cell_extent * (fi + 1.0) - gap;
            let y1 = 1.0 - cell_extent * fj;
            let y2 = 1.0 - cell_extent * (fj + 1.0) + gap;

            let u1 = fi * step;
            let u2 = (fi + 1.0) * step;
            let v1 = 1.0 - fj * step;
            let v2 = 1.0 - (fj + 1.0) * step;

            let corner = |x: f32, y: f32, u: f32, v: f32| Vertex {
                position: [x, y, MESH_Z],
                tex_coord: [u, v],
                row_index: fj,
                col_index: fi,
            };

            vertices.extend_from_slice(&[
                corner(x1, y1, u1, v1),
                corner(x2, y1, u2, v1),
                corner(x1, y2, u1, v2),
                corner(x2, y1, u2, v1),
                corner(x2, y2, u2, v2),
                corner(x1, y2, u1, v2),
            ]);
        }
    }

    Ok(Mesh {
        vertices,
        divisions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds(cell: &[Vertex]) -> (f32, f32, f32, f32) {
        let xs = cell.iter().map(|v| v.position[0]);
        let ys = cell.iter().map(|v| v.position[1]);
        (
            xs.clone().fold(f32::INFINITY, f32::min),
            xs.fold(f32::NEG_INFINITY, f32::max),
            ys.clone().fold(f32::INFINITY, f32::min),
            ys.fold(f32::NEG_INFINITY, f32::max),
        )
    }

    #[test]
    fn vertex_count_is_six_per_cell() {
        for d in [1, 2, 7, GRID_DIVISIONS] {
            let mesh = generate_mesh(d, 0.0).unwrap();
            assert_eq!(mesh.vertex_count(), 6 * d * d);
        }
    }

    #[test]
    fn single_cell_covers_the_square() {
        let mesh = generate_mesh(1, 0.0).unwrap();
        let (min_x, max_x, min_y, max_y) = bounds(mesh.vertices());
        assert_eq!((min_x, max_x, min_y, max_y), (-1.0, 1.0, -1.0, 1.0));
        assert!(mesh.vertices().iter().all(|v| v.position[2] == MESH_Z));
    }

    #[test]
    fn tight_neighbours_share_edges() {
        let mesh = generate_mesh(GRID_DIVISIONS, 0.0).unwrap();
        for col in 0..GRID_DIVISIONS - 1 {
            for row in 0..GRID_DIVISIONS - 1 {
                let (_, right, bottom, _) = bounds(mesh.cell(col, row).unwrap());
                let (next_left, _, _, _) = bounds(mesh.cell(col + 1, row).unwrap());
                let (_, _, _, below_top) = bounds(mesh.cell(col, row + 1).unwrap());
                assert_eq!(right, next_left);
                assert_eq!(bottom, below_top);
            }
        }
    }

    #[test]
    fn gap_pulls_right_and_bottom_edges_inward() {
        let tight = generate_mesh(4, 0.0).unwrap();
        let gapped = generate_mesh(4, TEAR_GAP).unwrap();
        let (l0, r0, b0, t0) = bounds(tight.cell(2, 1).unwrap());
        let (l1, r1, b1, t1) = bounds(gapped.cell(2, 1).unwrap());
        assert_eq!(l0, l1);
        assert_eq!(t0, t1);
        assert!((r0 - r1 - TEAR_GAP).abs() < 1e-6);
        assert!((b1 - b0 - TEAR_GAP).abs() < 1e-6);
    }

    #[test]
    fn texture_coordinates_ignore_gap() {
        let tight = generate_mesh(3, 0.0).unwrap();
        let gapped = generate_mesh(3, 0.05).unwrap();
        for (a, b) in tight.vertices().iter().zip(gapped.vertices()) {
            assert_eq!(a.tex_coord, b.tex_coord);
            assert!((0.0..=1.0).contains(&a.tex_coord[0]));
            assert!((0.0..=1.0).contains(&a.tex_coord[1]));
        }
    }

    #[test]
    fn vertices_carry_cell_indices() {
        let mesh = generate_mesh(5, 0.0).unwrap();
        let cell = mesh.cell(3, 1).unwrap();
        assert!(cell.iter().all(|v| v.col_index == 3.0 && v.row_index == 1.0));
        let [u, v] = cell[0].tex_coord;
        assert!((u - 0.6).abs() < 1e-6);
        assert!((v - 0.8).abs() < 1e-6);
    }

    #[test]
    fn rejects_degenerate_parameters() {
        assert!(matches!(generate_mesh(0, 0.0), Err(RenderError::InvalidMesh(_))));
        assert!(generate_mesh(4, -0.1).is_err());
        assert!(generate_mesh(4, f32::NAN).is_err());
        assert!(generate_mesh(4, 0.5).is_err());
    }

    #[test]
    fn layout_stride_is_seven_floats() {
        let layout = Vertex::buffer_layout();
        assert_eq!(layout.array_stride, 28);
        let offsets: Vec<_> = layout.attributes.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 12, 20, 24]);
    }
}
