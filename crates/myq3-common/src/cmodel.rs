// cmodel.rs — collision model loading and tracing
//
// Loads the collision-relevant lumps of a BSP world and answers point
// and swept-box queries against it. Box traces are reduced to point
// traces against expanded planes: every brush side's plane distance is
// shifted by the box corner selected by the side normal's sign bits.

use crate::md4::com_block_checksum;
use crate::q_shared::{
    angle_vectors, dot_product, plane_type_for_normal, signbits_for_normal, vector_subtract,
    CPlane, TokenParser, Trace, Vec3, CONTENTS_SOLID, PLANE_NON_AXIAL,
};
use crate::qfiles::{
    read_f32_le, read_i32_le, Lump, BSP_IDENT, BSP_VERSION, DBRUSHSIDE_SIZE, DBRUSH_SIZE,
    DLEAF_SIZE, DMODEL_SIZE, DNODE_SIZE, DPLANE_SIZE, DSHADER_SIZE, HEADER_LUMPS, LUMP_BRUSHES,
    LUMP_BRUSHSIDES, LUMP_ENTITIES, LUMP_LEAFBRUSHES, LUMP_LEAFS, LUMP_MODELS, LUMP_NODES,
    LUMP_PLANES, LUMP_SHADERS, MAX_MAP_ENTSTRING,
};
use rayon::prelude::*;
use thiserror::Error;

// keep the crosspoint this many units to the near side
const SURFACE_CLIP_EPSILON: f32 = 0.125;

// lateral slack for box traces against non-axial planes; conservative
// but correct, the tree only over-visits
const NON_AXIAL_SLACK: f32 = 2048.0;

const MAX_SUBMODELS: usize = 256;
pub const BOX_MODEL_HANDLE: ClipHandle = MAX_SUBMODELS as i32 - 1;

const MAX_POSITION_LEAFS: usize = 1024;
const MAX_WORLD_COORD: f32 = 65536.0;

/// Opaque reference to something traceable: inline model 0 is the whole
/// world, higher numbers are door/platform submodels, and
/// `BOX_MODEL_HANDLE` is the per-call temp box.
pub type ClipHandle = i32;

#[derive(Debug, Error)]
pub enum WorldError {
    #[error("{0}: file too short")]
    Truncated(String),
    #[error("{0} is not an IBSP file")]
    BadIdent(String),
    #[error("{0} has wrong version number ({1} should be {2})")]
    BadVersion(String, i32, i32),
    #[error("{0}: funny lump size ({1})")]
    FunnyLumpSize(String, &'static str),
    #[error("{0}: lump out of range ({1})")]
    LumpOutOfRange(String, &'static str),
    #[error("{0}: map with no {1}")]
    Missing(String, &'static str),
    #[error("{0}: bad index in {1}")]
    BadIndex(String, &'static str),
}

// ============================================================
// Runtime structures
// ============================================================

#[derive(Debug, Clone, Default)]
pub struct CShader {
    pub content_flags: i32,
    pub surface_flags: i32,
}

#[derive(Debug, Clone, Default)]
pub struct CNode {
    pub plane_idx: usize,
    pub children: [i32; 2], // negative numbers are -(leaf + 1)
}

#[derive(Debug, Clone, Default)]
pub struct CLeaf {
    pub cluster: i32,
    pub area: i32,
    pub first_leaf_brush: i32,
    pub num_leaf_brushes: i32,
}

#[derive(Debug, Clone, Default)]
pub struct CBrush {
    pub shader_idx: usize,
    pub contents: i32,
    pub bounds: [Vec3; 2],
    pub first_side: usize,
    pub num_sides: usize,
    checkcount: i32, // per-trace dedupe across leaves
}

#[derive(Debug, Clone, Default)]
pub struct CBrushSide {
    pub plane_idx: usize,
    pub surface_flags: i32,
}

/// Inline submodel: bounds plus a direct brush range (submodels are
/// traced without a tree walk).
#[derive(Debug, Clone, Copy, Default)]
pub struct CModelData {
    pub mins: Vec3,
    pub maxs: Vec3,
    pub first_brush: i32,
    pub num_brushes: i32,
}

// ============================================================
// Trace work — all per-trace state, passed through the recursion
// ============================================================

struct TraceWork {
    start: Vec3,
    end: Vec3,
    size: [Vec3; 2], // symmetric box around origin
    offsets: [Vec3; 8], // box corner for each plane signbits value
    extents: Vec3,   // greatest of abs(size[0]) and abs(size[1])
    contents: i32,
    is_point: bool,
    trace: Trace,
}

// ============================================================
// Context
// ============================================================

pub struct CModelContext {
    pub name: String,
    pub checksum: u32,

    shaders: Vec<CShader>,
    planes: Vec<CPlane>,
    nodes: Vec<CNode>,
    leafs: Vec<CLeaf>,
    leaf_brushes: Vec<i32>,
    brushes: Vec<CBrush>,
    brush_sides: Vec<CBrushSide>,
    cmodels: Vec<CModelData>,

    entity_string: String,
    entity_parse_ofs: usize,

    checkcount: i32,

    // temp box model: one brush over twelve dedicated planes, rebuilt
    // per temp_box_model call
    box_planes_start: usize,
    box_brush_idx: usize,

    // performance counters
    pub c_traces: i32,
    pub c_point_contents: i32,
}

/// Below this record count a lump parses sequentially; above it the
/// columns parse in parallel.
const PARALLEL_LUMP_THRESHOLD: usize = 64;

impl CModelContext {
    pub fn new() -> Self {
        let mut ctx = Self {
            name: String::new(),
            checksum: 0,
            shaders: Vec::new(),
            planes: Vec::new(),
            nodes: Vec::new(),
            leafs: Vec::new(),
            leaf_brushes: Vec::new(),
            brushes: Vec::new(),
            brush_sides: Vec::new(),
            cmodels: Vec::new(),
            entity_string: String::new(),
            entity_parse_ofs: 0,
            checkcount: 0,
            box_planes_start: 0,
            box_brush_idx: 0,
            c_traces: 0,
            c_point_contents: 0,
        };
        ctx.init_box_hull();
        ctx
    }

    pub fn is_loaded(&self) -> bool {
        !self.nodes.is_empty()
    }

    // ============================================================
    // Lump loaders
    // ============================================================

    fn lump_slice<'a>(
        &self,
        data: &'a [u8],
        lump: &Lump,
        which: &'static str,
    ) -> Result<&'a [u8], WorldError> {
        let ofs = lump.fileofs as usize;
        let len = lump.filelen as usize;
        if lump.fileofs < 0 || lump.filelen < 0 || ofs + len > data.len() {
            return Err(WorldError::LumpOutOfRange(self.name.clone(), which));
        }
        Ok(&data[ofs..ofs + len])
    }

    fn load_shaders(&mut self, data: &[u8]) -> Result<(), WorldError> {
        if !data.len().is_multiple_of(DSHADER_SIZE) {
            return Err(WorldError::FunnyLumpSize(self.name.clone(), "shaders"));
        }
        let count = data.len() / DSHADER_SIZE;
        if count < 1 {
            return Err(WorldError::Missing(self.name.clone(), "shaders"));
        }
        self.shaders = (0..count)
            .map(|i| {
                let base = i * DSHADER_SIZE;
                CShader {
                    surface_flags: read_i32_le(data, base + 64),
                    content_flags: read_i32_le(data, base + 68),
                }
            })
            .collect();
        Ok(())
    }

    fn load_planes(&mut self, data: &[u8]) -> Result<(), WorldError> {
        if !data.len().is_multiple_of(DPLANE_SIZE) {
            return Err(WorldError::FunnyLumpSize(self.name.clone(), "planes"));
        }
        let count = data.len() / DPLANE_SIZE;
        if count < 1 {
            return Err(WorldError::Missing(self.name.clone(), "planes"));
        }

        let parse = |i: usize| {
            let base = i * DPLANE_SIZE;
            let normal = [
                read_f32_le(data, base),
                read_f32_le(data, base + 4),
                read_f32_le(data, base + 8),
            ];
            CPlane {
                normal,
                dist: read_f32_le(data, base + 12),
                plane_type: plane_type_for_normal(&normal),
                signbits: signbits_for_normal(&normal),
            }
        };

        self.planes = if count >= PARALLEL_LUMP_THRESHOLD {
            (0..count).into_par_iter().map(parse).collect()
        } else {
            (0..count).map(parse).collect()
        };
        Ok(())
    }

    fn load_nodes(&mut self, data: &[u8]) -> Result<(), WorldError> {
        if !data.len().is_multiple_of(DNODE_SIZE) {
            return Err(WorldError::FunnyLumpSize(self.name.clone(), "nodes"));
        }
        let count = data.len() / DNODE_SIZE;
        if count < 1 {
            return Err(WorldError::Missing(self.name.clone(), "nodes"));
        }
        let numplanes = self.planes.len();
        self.nodes = Vec::with_capacity(count);
        for i in 0..count {
            let base = i * DNODE_SIZE;
            let plane_idx = read_i32_le(data, base);
            if plane_idx < 0 || plane_idx as usize >= numplanes {
                return Err(WorldError::BadIndex(self.name.clone(), "nodes"));
            }
            self.nodes.push(CNode {
                plane_idx: plane_idx as usize,
                children: [read_i32_le(data, base + 4), read_i32_le(data, base + 8)],
            });
        }
        Ok(())
    }

    fn load_leafs(&mut self, data: &[u8]) -> Result<(), WorldError> {
        if !data.len().is_multiple_of(DLEAF_SIZE) {
            return Err(WorldError::FunnyLumpSize(self.name.clone(), "leafs"));
        }
        let count = data.len() / DLEAF_SIZE;
        if count < 1 {
            return Err(WorldError::Missing(self.name.clone(), "leafs"));
        }
        self.leafs = (0..count)
            .map(|i| {
                let base = i * DLEAF_SIZE;
                CLeaf {
                    cluster: read_i32_le(data, base),
                    area: read_i32_le(data, base + 4),
                    first_leaf_brush: read_i32_le(data, base + 40),
                    num_leaf_brushes: read_i32_le(data, base + 44),
                }
            })
            .collect();
        Ok(())
    }

    fn load_leaf_brushes(&mut self, data: &[u8]) -> Result<(), WorldError> {
        if !data.len().is_multiple_of(4) {
            return Err(WorldError::FunnyLumpSize(self.name.clone(), "leafbrushes"));
        }
        let count = data.len() / 4;
        self.leaf_brushes = (0..count).map(|i| read_i32_le(data, i * 4)).collect();
        Ok(())
    }

    fn load_brushes(&mut self, data: &[u8]) -> Result<(), WorldError> {
        if !data.len().is_multiple_of(DBRUSH_SIZE) {
            return Err(WorldError::FunnyLumpSize(self.name.clone(), "brushes"));
        }
        let count = data.len() / DBRUSH_SIZE;
        self.brushes = Vec::with_capacity(count + 1); // plus the box brush
        for i in 0..count {
            let base = i * DBRUSH_SIZE;
            let first_side = read_i32_le(data, base);
            let num_sides = read_i32_le(data, base + 4);
            let shader_num = read_i32_le(data, base + 8);
            if shader_num < 0 || shader_num as usize >= self.shaders.len() {
                return Err(WorldError::BadIndex(self.name.clone(), "brushes"));
            }
            if first_side < 0
                || num_sides < 0
                || (first_side + num_sides) as usize > self.brush_sides.len()
            {
                return Err(WorldError::BadIndex(self.name.clone(), "brushes"));
            }
            let mut brush = CBrush {
                shader_idx: shader_num as usize,
                contents: self.shaders[shader_num as usize].content_flags,
                bounds: [[-MAX_WORLD_COORD; 3], [MAX_WORLD_COORD; 3]],
                first_side: first_side as usize,
                num_sides: num_sides as usize,
                checkcount: 0,
            };
            self.bound_brush(&mut brush);
            self.brushes.push(brush);
        }
        Ok(())
    }

    /// Axial bounds from the first six sides, which the compiler always
    /// emits axially in -x +x -y +y -z +z order.
    fn bound_brush(&self, brush: &mut CBrush) {
        if brush.num_sides < 6 {
            return; // keep the conservative default bounds
        }
        let s = brush.first_side;
        brush.bounds[0][0] = -self.planes[self.brush_sides[s].plane_idx].dist;
        brush.bounds[1][0] = self.planes[self.brush_sides[s + 1].plane_idx].dist;
        brush.bounds[0][1] = -self.planes[self.brush_sides[s + 2].plane_idx].dist;
        brush.bounds[1][1] = self.planes[self.brush_sides[s + 3].plane_idx].dist;
        brush.bounds[0][2] = -self.planes[self.brush_sides[s + 4].plane_idx].dist;
        brush.bounds[1][2] = self.planes[self.brush_sides[s + 5].plane_idx].dist;
    }

    fn load_brush_sides(&mut self, data: &[u8]) -> Result<(), WorldError> {
        if !data.len().is_multiple_of(DBRUSHSIDE_SIZE) {
            return Err(WorldError::FunnyLumpSize(self.name.clone(), "brushsides"));
        }
        let count = data.len() / DBRUSHSIDE_SIZE;
        let numplanes = self.planes.len();
        let shaders = &self.shaders;
        let name = self.name.clone();

        let parse = |i: usize| -> Result<CBrushSide, WorldError> {
            let base = i * DBRUSHSIDE_SIZE;
            let plane_num = read_i32_le(data, base);
            let shader_num = read_i32_le(data, base + 4);
            if plane_num < 0 || plane_num as usize >= numplanes {
                return Err(WorldError::BadIndex(name.clone(), "brushsides"));
            }
            let surface_flags = if shader_num >= 0 && (shader_num as usize) < shaders.len() {
                shaders[shader_num as usize].surface_flags
            } else {
                0
            };
            Ok(CBrushSide {
                plane_idx: plane_num as usize,
                surface_flags,
            })
        };

        self.brush_sides = if count >= PARALLEL_LUMP_THRESHOLD {
            (0..count)
                .into_par_iter()
                .map(parse)
                .collect::<Result<Vec<_>, _>>()?
        } else {
            (0..count).map(parse).collect::<Result<Vec<_>, _>>()?
        };
        Ok(())
    }

    fn load_submodels(&mut self, data: &[u8]) -> Result<(), WorldError> {
        if !data.len().is_multiple_of(DMODEL_SIZE) {
            return Err(WorldError::FunnyLumpSize(self.name.clone(), "models"));
        }
        let count = data.len() / DMODEL_SIZE;
        if count < 1 {
            return Err(WorldError::Missing(self.name.clone(), "models"));
        }
        if count > MAX_SUBMODELS {
            return Err(WorldError::BadIndex(self.name.clone(), "models"));
        }
        self.cmodels = (0..count)
            .map(|i| {
                let base = i * DMODEL_SIZE;
                let mut cm = CModelData::default();
                for j in 0..3 {
                    // spread by one unit so content flags hit at the surface
                    cm.mins[j] = read_f32_le(data, base + j * 4) - 1.0;
                    cm.maxs[j] = read_f32_le(data, base + 12 + j * 4) + 1.0;
                }
                cm.first_brush = read_i32_le(data, base + 32);
                cm.num_brushes = read_i32_le(data, base + 36);
                cm
            })
            .collect();
        Ok(())
    }

    fn load_entity_string(&mut self, data: &[u8]) -> Result<(), WorldError> {
        if data.len() > MAX_MAP_ENTSTRING {
            return Err(WorldError::FunnyLumpSize(self.name.clone(), "entities"));
        }
        self.entity_string = String::from_utf8_lossy(data).into_owned();
        self.entity_parse_ofs = 0;
        Ok(())
    }

    // ============================================================
    // Map loading
    // ============================================================

    /// Load a BSP world from raw file bytes. A failed load leaves the
    /// context cleared (every trace misses).
    pub fn load_map(&mut self, name: &str, data: &[u8]) -> Result<u32, WorldError> {
        self.clear();
        self.name = name.to_string();

        if data.len() < 8 + HEADER_LUMPS * 8 {
            return Err(WorldError::Truncated(name.to_string()));
        }
        if read_i32_le(data, 0) as u32 != BSP_IDENT {
            return Err(WorldError::BadIdent(name.to_string()));
        }
        let version = read_i32_le(data, 4);
        if version != BSP_VERSION {
            return Err(WorldError::BadVersion(name.to_string(), version, BSP_VERSION));
        }

        let mut lumps = [Lump::default(); HEADER_LUMPS];
        for (i, lump) in lumps.iter_mut().enumerate() {
            lump.fileofs = read_i32_le(data, 8 + i * 8);
            lump.filelen = read_i32_le(data, 8 + i * 8 + 4);
        }

        let result = (|| {
            self.load_shaders(self.lump_slice(data, &lumps[LUMP_SHADERS], "shaders")?)?;
            self.load_planes(self.lump_slice(data, &lumps[LUMP_PLANES], "planes")?)?;
            self.load_brush_sides(self.lump_slice(data, &lumps[LUMP_BRUSHSIDES], "brushsides")?)?;
            self.load_brushes(self.lump_slice(data, &lumps[LUMP_BRUSHES], "brushes")?)?;
            self.load_leaf_brushes(self.lump_slice(data, &lumps[LUMP_LEAFBRUSHES], "leafbrushes")?)?;
            self.load_leafs(self.lump_slice(data, &lumps[LUMP_LEAFS], "leafs")?)?;
            self.load_nodes(self.lump_slice(data, &lumps[LUMP_NODES], "nodes")?)?;
            self.load_submodels(self.lump_slice(data, &lumps[LUMP_MODELS], "models")?)?;
            self.load_entity_string(self.lump_slice(data, &lumps[LUMP_ENTITIES], "entities")?)?;
            Ok(())
        })();

        if let Err(e) = result {
            self.clear();
            return Err(e);
        }

        self.init_box_hull();
        self.checksum = com_block_checksum(data);
        Ok(self.checksum)
    }

    /// Drop all world data; traces against the cleared context miss.
    pub fn clear(&mut self) {
        self.name.clear();
        self.checksum = 0;
        self.shaders.clear();
        self.planes.clear();
        self.nodes.clear();
        self.leafs.clear();
        self.leaf_brushes.clear();
        self.brushes.clear();
        self.brush_sides.clear();
        self.cmodels.clear();
        self.entity_string.clear();
        self.entity_parse_ofs = 0;
        self.init_box_hull();
    }

    // ============================================================
    // Temp box model
    // ============================================================

    /// Twelve dedicated planes and one brush at the tail of the arrays;
    /// `temp_box_model` only rewrites distances.
    fn init_box_hull(&mut self) {
        self.box_planes_start = self.planes.len();
        self.box_brush_idx = self.brushes.len();

        let first_side = self.brush_sides.len();
        for i in 0..6usize {
            let side = i & 1;

            self.brush_sides.push(CBrushSide {
                plane_idx: self.box_planes_start + i * 2 + side,
                surface_flags: 0,
            });

            let mut normal = [0.0f32; 3];
            normal[i >> 1] = 1.0;
            self.planes.push(CPlane {
                normal,
                dist: 0.0,
                plane_type: (i >> 1) as u8,
                signbits: 0,
            });

            let mut normal = [0.0f32; 3];
            normal[i >> 1] = -1.0;
            self.planes.push(CPlane {
                normal,
                dist: 0.0,
                plane_type: PLANE_NON_AXIAL,
                signbits: signbits_for_normal(&normal),
            });
        }

        self.brushes.push(CBrush {
            shader_idx: 0,
            contents: CONTENTS_SOLID, // caller decides via the brushmask
            bounds: [[0.0; 3], [0.0; 3]],
            first_side,
            num_sides: 6,
            checkcount: 0,
        });
    }

    /// Set up the temp box for an AABB and return its clip handle. The
    /// box stays valid until the next call.
    pub fn temp_box_model(&mut self, mins: &Vec3, maxs: &Vec3) -> ClipHandle {
        let bp = self.box_planes_start;
        self.planes[bp].dist = maxs[0];
        self.planes[bp + 1].dist = -maxs[0];
        self.planes[bp + 2].dist = mins[0];
        self.planes[bp + 3].dist = -mins[0];
        self.planes[bp + 4].dist = maxs[1];
        self.planes[bp + 5].dist = -maxs[1];
        self.planes[bp + 6].dist = mins[1];
        self.planes[bp + 7].dist = -mins[1];
        self.planes[bp + 8].dist = maxs[2];
        self.planes[bp + 9].dist = -maxs[2];
        self.planes[bp + 10].dist = mins[2];
        self.planes[bp + 11].dist = -mins[2];

        let brush = &mut self.brushes[self.box_brush_idx];
        brush.bounds = [*mins, *maxs];

        BOX_MODEL_HANDLE
    }

    // ============================================================
    // Inline models
    // ============================================================

    pub fn num_inline_models(&self) -> usize {
        self.cmodels.len()
    }

    pub fn inline_model(&self, index: i32) -> ClipHandle {
        if index < 0 || index as usize >= self.cmodels.len() {
            return 0;
        }
        index
    }

    pub fn model_bounds(&self, model: ClipHandle) -> (Vec3, Vec3) {
        if model == BOX_MODEL_HANDLE {
            let b = &self.brushes[self.box_brush_idx].bounds;
            return (b[0], b[1]);
        }
        match self.cmodels.get(model as usize) {
            Some(cm) => (cm.mins, cm.maxs),
            None => ([0.0; 3], [0.0; 3]),
        }
    }

    pub fn entity_string(&self) -> &str {
        &self.entity_string
    }

    /// Stream the next token of the entity lump; resets on map load.
    pub fn next_entity_token(&mut self) -> Option<String> {
        let mut parser = TokenParser::new(&self.entity_string);
        parser.set_offset(self.entity_parse_ofs);
        let token = parser.token();
        self.entity_parse_ofs = parser.offset();
        token
    }

    pub fn rewind_entity_tokens(&mut self) {
        self.entity_parse_ofs = 0;
    }

    // ============================================================
    // Tracing
    // ============================================================

    fn trace_through_brush(&mut self, tw: &mut TraceWork, brush_idx: usize) {
        let brush = &self.brushes[brush_idx];
        if brush.num_sides == 0 {
            return;
        }

        let mut enter_frac = -1.0f32;
        let mut leave_frac = 1.0f32;
        let mut clip_plane: Option<usize> = None;
        let mut lead_side: Option<usize> = None;
        let mut getout = false;
        let mut startout = false;

        for i in 0..brush.num_sides {
            let side_idx = brush.first_side + i;
            let plane = &self.planes[self.brush_sides[side_idx].plane_idx];

            // adjust the plane distance appropriately for the box size
            let dist = if tw.is_point {
                plane.dist
            } else {
                plane.dist - dot_product(&tw.offsets[plane.signbits as usize], &plane.normal)
            };

            let d1 = dot_product(&tw.start, &plane.normal) - dist;
            let d2 = dot_product(&tw.end, &plane.normal) - dist;

            if d2 > 0.0 {
                getout = true; // endpoint is not in solid
            }
            if d1 > 0.0 {
                startout = true;
            }

            // completely in front of this side, no intersection
            if d1 > 0.0 && (d2 >= SURFACE_CLIP_EPSILON || d2 >= d1) {
                return;
            }
            if d1 <= 0.0 && d2 <= 0.0 {
                continue;
            }

            if d1 > d2 {
                // entering
                let mut f = (d1 - SURFACE_CLIP_EPSILON) / (d1 - d2);
                if f < 0.0 {
                    f = 0.0;
                }
                if f > enter_frac {
                    enter_frac = f;
                    clip_plane = Some(self.brush_sides[side_idx].plane_idx);
                    lead_side = Some(side_idx);
                }
            } else {
                // leaving
                let mut f = (d1 + SURFACE_CLIP_EPSILON) / (d1 - d2);
                if f > 1.0 {
                    f = 1.0;
                }
                if f < leave_frac {
                    leave_frac = f;
                }
            }
        }

        if !startout {
            // original point was inside the brush
            tw.trace.startsolid = true;
            if !getout {
                tw.trace.allsolid = true;
                tw.trace.fraction = 0.0;
                tw.trace.contents = brush.contents;
            }
            return;
        }

        if enter_frac < leave_frac && enter_frac > -1.0 && enter_frac < tw.trace.fraction {
            let enter_frac = enter_frac.max(0.0);
            tw.trace.fraction = enter_frac;
            if let Some(p) = clip_plane {
                tw.trace.plane = self.planes[p];
            }
            if let Some(s) = lead_side {
                tw.trace.surface_flags = self.brush_sides[s].surface_flags;
            }
            tw.trace.contents = brush.contents;
        }
    }

    fn test_box_in_brush(&mut self, tw: &mut TraceWork, brush_idx: usize) {
        let brush = &self.brushes[brush_idx];
        if brush.num_sides == 0 {
            return;
        }

        for i in 0..brush.num_sides {
            let plane = &self.planes[self.brush_sides[brush.first_side + i].plane_idx];
            let dist = if tw.is_point {
                plane.dist
            } else {
                plane.dist - dot_product(&tw.offsets[plane.signbits as usize], &plane.normal)
            };
            if dot_product(&tw.start, &plane.normal) - dist > 0.0 {
                return; // outside this side
            }
        }

        tw.trace.startsolid = true;
        tw.trace.allsolid = true;
        tw.trace.fraction = 0.0;
        tw.trace.contents = brush.contents;
    }

    fn trace_through_leaf(&mut self, tw: &mut TraceWork, leaf_idx: usize) {
        let (first, count) = match self.leafs.get(leaf_idx) {
            Some(leaf) => (leaf.first_leaf_brush, leaf.num_leaf_brushes),
            None => return, // invalid indices never abort simulation
        };

        for k in 0..count {
            let lb_idx = (first + k) as usize;
            let brush_num = match self.leaf_brushes.get(lb_idx) {
                Some(&b) if b >= 0 && (b as usize) < self.brushes.len() => b as usize,
                _ => continue, // invalid indices never abort simulation
            };
            if self.brushes[brush_num].checkcount == self.checkcount {
                continue; // already checked this brush in another leaf
            }
            self.brushes[brush_num].checkcount = self.checkcount;

            if self.brushes[brush_num].contents & tw.contents == 0 {
                continue;
            }
            self.trace_through_brush(tw, brush_num);
            if tw.trace.fraction == 0.0 {
                return;
            }
        }
    }

    fn trace_through_tree(
        &mut self,
        tw: &mut TraceWork,
        num: i32,
        p1f: f32,
        p2f: f32,
        p1: Vec3,
        p2: Vec3,
    ) {
        if tw.trace.fraction <= p1f {
            return; // already hit something nearer
        }

        if num < 0 {
            self.trace_through_leaf(tw, (-1 - num) as usize);
            return;
        }

        let node = match self.nodes.get(num as usize) {
            Some(n) => n,
            None => return,
        };
        let children = node.children;
        let plane = &self.planes[node.plane_idx];

        // distance of the segment endpoints from the plane, and the
        // lateral slack of the query box against it
        let (t1, t2, offset);
        if (plane.plane_type as usize) < 3 {
            let pt = plane.plane_type as usize;
            t1 = p1[pt] - plane.dist;
            t2 = p2[pt] - plane.dist;
            offset = tw.extents[pt];
        } else {
            t1 = dot_product(&plane.normal, &p1) - plane.dist;
            t2 = dot_product(&plane.normal, &p2) - plane.dist;
            offset = if tw.is_point { 0.0 } else { NON_AXIAL_SLACK };
        }

        // entirely on one side: recurse into that child only
        if t1 >= offset + 1.0 && t2 >= offset + 1.0 {
            self.trace_through_tree(tw, children[0], p1f, p2f, p1, p2);
            return;
        }
        if t1 < -offset - 1.0 && t2 < -offset - 1.0 {
            self.trace_through_tree(tw, children[1], p1f, p2f, p1, p2);
            return;
        }

        // put the crosspoint SURFACE_CLIP_EPSILON units on the near side
        let (side, frac, frac2);
        if t1 < t2 {
            let idist = 1.0 / (t1 - t2);
            side = 1usize;
            frac2 = (t1 + offset + SURFACE_CLIP_EPSILON) * idist;
            frac = (t1 - offset + SURFACE_CLIP_EPSILON) * idist;
        } else if t1 > t2 {
            let idist = 1.0 / (t1 - t2);
            side = 0usize;
            frac2 = (t1 - offset - SURFACE_CLIP_EPSILON) * idist;
            frac = (t1 + offset + SURFACE_CLIP_EPSILON) * idist;
        } else {
            side = 0;
            frac = 1.0;
            frac2 = 0.0;
        }

        // move up to the node
        let frac = frac.clamp(0.0, 1.0);
        let midf = p1f + (p2f - p1f) * frac;
        let mid = [
            p1[0] + frac * (p2[0] - p1[0]),
            p1[1] + frac * (p2[1] - p1[1]),
            p1[2] + frac * (p2[2] - p1[2]),
        ];
        self.trace_through_tree(tw, children[side], p1f, midf, p1, mid);

        // go past the node
        let frac2 = frac2.clamp(0.0, 1.0);
        let midf2 = p1f + (p2f - p1f) * frac2;
        let mid2 = [
            p1[0] + frac2 * (p2[0] - p1[0]),
            p1[1] + frac2 * (p2[1] - p1[1]),
            p1[2] + frac2 * (p2[2] - p1[2]),
        ];
        self.trace_through_tree(tw, children[side ^ 1], midf2, p2f, mid2, p2);
    }

    fn position_test(&mut self, tw: &mut TraceWork, model: ClipHandle) {
        if model == BOX_MODEL_HANDLE {
            let idx = self.box_brush_idx;
            if self.brushes[idx].contents & tw.contents != 0 {
                self.test_box_in_brush(tw, idx);
            }
            return;
        }
        if let Some(&cm) = self.cmodels.get(model as usize) {
            if model != 0 {
                for k in 0..cm.num_brushes {
                    let idx = (cm.first_brush + k) as usize;
                    if idx < self.brushes.len()
                        && self.brushes[idx].contents & tw.contents != 0
                    {
                        self.test_box_in_brush(tw, idx);
                        if tw.trace.allsolid {
                            return;
                        }
                    }
                }
                return;
            }
        }
        if self.nodes.is_empty() {
            return;
        }

        // world: collect the leafs the expanded box touches
        let mins = [
            tw.start[0] + tw.size[0][0] - 1.0,
            tw.start[1] + tw.size[0][1] - 1.0,
            tw.start[2] + tw.size[0][2] - 1.0,
        ];
        let maxs = [
            tw.start[0] + tw.size[1][0] + 1.0,
            tw.start[1] + tw.size[1][1] + 1.0,
            tw.start[2] + tw.size[1][2] + 1.0,
        ];
        let mut leafs = Vec::with_capacity(64);
        self.box_leafnums_r(0, &mins, &maxs, &mut leafs);
        for leaf_idx in leafs {
            let (first, count) = match self.leafs.get(leaf_idx) {
                Some(leaf) => (leaf.first_leaf_brush, leaf.num_leaf_brushes),
                None => continue,
            };
            for k in 0..count {
                let brush_num = match self.leaf_brushes.get((first + k) as usize) {
                    Some(&b) if b >= 0 && (b as usize) < self.brushes.len() => b as usize,
                    _ => continue,
                };
                if self.brushes[brush_num].checkcount == self.checkcount {
                    continue;
                }
                self.brushes[brush_num].checkcount = self.checkcount;
                if self.brushes[brush_num].contents & tw.contents == 0 {
                    continue;
                }
                self.test_box_in_brush(tw, brush_num);
                if tw.trace.allsolid {
                    return;
                }
            }
        }
    }

    fn box_leafnums_r(&self, num: i32, mins: &Vec3, maxs: &Vec3, list: &mut Vec<usize>) {
        let mut num = num;
        loop {
            if num < 0 {
                if list.len() < MAX_POSITION_LEAFS {
                    list.push((-1 - num) as usize);
                }
                return;
            }
            let node = match self.nodes.get(num as usize) {
                Some(n) => n,
                None => return,
            };
            let plane = &self.planes[node.plane_idx];

            let (d1, d2);
            if (plane.plane_type as usize) < 3 {
                let pt = plane.plane_type as usize;
                d1 = mins[pt] - plane.dist;
                d2 = maxs[pt] - plane.dist;
            } else {
                // conservative: test all corners via the extreme points
                let mut near = 0.0;
                let mut far = 0.0;
                for j in 0..3 {
                    if plane.normal[j] >= 0.0 {
                        near += plane.normal[j] * mins[j];
                        far += plane.normal[j] * maxs[j];
                    } else {
                        near += plane.normal[j] * maxs[j];
                        far += plane.normal[j] * mins[j];
                    }
                }
                d1 = near - plane.dist;
                d2 = far - plane.dist;
            }

            if d1 > 0.0 && d2 > 0.0 {
                num = node.children[0];
            } else if d1 < 0.0 && d2 < 0.0 {
                num = node.children[1];
            } else {
                self.box_leafnums_r(node.children[0], mins, maxs, list);
                num = node.children[1];
            }
        }
    }

    /// Swept box trace. `mins`/`maxs` of zero trace a point. A trace
    /// against an unloaded world is a clean miss.
    pub fn box_trace(
        &mut self,
        start: &Vec3,
        end: &Vec3,
        mins: &Vec3,
        maxs: &Vec3,
        model: ClipHandle,
        brushmask: i32,
    ) -> Trace {
        self.checkcount += 1; // for multi-check avoidance
        self.c_traces += 1;

        let mut tw = TraceWork {
            start: [0.0; 3],
            end: [0.0; 3],
            size: [[0.0; 3]; 2],
            offsets: [[0.0; 3]; 8],
            extents: [0.0; 3],
            contents: brushmask,
            is_point: false,
            trace: Trace {
                fraction: 1.0,
                ..Default::default()
            },
        };

        if self.brushes.is_empty() {
            tw.trace.endpos = *end;
            return tw.trace;
        }

        // adjust so the box is symmetric around the trace origin
        for i in 0..3 {
            let offset = (mins[i] + maxs[i]) * 0.5;
            tw.size[0][i] = mins[i] - offset;
            tw.size[1][i] = maxs[i] - offset;
            tw.start[i] = start[i] + offset;
            tw.end[i] = end[i] + offset;
            tw.extents[i] = tw.size[1][i];
        }

        tw.is_point = tw.size[1] == [0.0, 0.0, 0.0];

        // box corner for each plane signbits combination
        for i in 0..8usize {
            for j in 0..3usize {
                tw.offsets[i][j] = tw.size[(i >> j) & 1][j];
            }
        }

        if tw.start == tw.end {
            self.position_test(&mut tw, model);
        } else if model == BOX_MODEL_HANDLE {
            let idx = self.box_brush_idx;
            if self.brushes[idx].contents & tw.contents != 0 {
                self.trace_through_brush(&mut tw, idx);
            }
        } else if model != 0 && (model as usize) < self.cmodels.len() {
            // submodels are traced directly, no tree walk
            let cm = self.cmodels[model as usize];
            for k in 0..cm.num_brushes {
                let idx = (cm.first_brush + k) as usize;
                if idx < self.brushes.len() && self.brushes[idx].contents & tw.contents != 0 {
                    self.trace_through_brush(&mut tw, idx);
                    if tw.trace.fraction == 0.0 {
                        break;
                    }
                }
            }
        } else if !self.nodes.is_empty() {
            let (p1, p2) = (tw.start, tw.end);
            self.trace_through_tree(&mut tw, 0, 0.0, 1.0, p1, p2);
        }

        // generate endpos from the original, unshifted line
        let mut trace = tw.trace;
        if trace.fraction == 1.0 {
            trace.endpos = *end;
        } else {
            for i in 0..3 {
                trace.endpos[i] = start[i] + trace.fraction * (end[i] - start[i]);
            }
        }
        trace
    }

    /// Trace against a model at an arbitrary origin and rotation. Used
    /// for doors and platforms; the segment is moved into model space
    /// and the impact normal rotated back out.
    #[allow(clippy::too_many_arguments)]
    pub fn transformed_box_trace(
        &mut self,
        start: &Vec3,
        end: &Vec3,
        mins: &Vec3,
        maxs: &Vec3,
        model: ClipHandle,
        brushmask: i32,
        origin: &Vec3,
        angles: &Vec3,
    ) -> Trace {
        let mut start_l = vector_subtract(start, origin);
        let mut end_l = vector_subtract(end, origin);

        let rotated = model != BOX_MODEL_HANDLE
            && (angles[0] != 0.0 || angles[1] != 0.0 || angles[2] != 0.0);

        let mut forward = [0.0f32; 3];
        let mut right = [0.0f32; 3];
        let mut up = [0.0f32; 3];
        if rotated {
            angle_vectors(angles, Some(&mut forward), Some(&mut right), Some(&mut up));

            let temp = start_l;
            start_l = [
                dot_product(&temp, &forward),
                -dot_product(&temp, &right),
                dot_product(&temp, &up),
            ];
            let temp = end_l;
            end_l = [
                dot_product(&temp, &forward),
                -dot_product(&temp, &right),
                dot_product(&temp, &up),
            ];
        }

        let mut trace = self.box_trace(&start_l, &end_l, mins, maxs, model, brushmask);

        if rotated && trace.fraction != 1.0 {
            let a = [-angles[0], -angles[1], -angles[2]];
            angle_vectors(&a, Some(&mut forward), Some(&mut right), Some(&mut up));
            let temp = trace.plane.normal;
            trace.plane.normal = [
                dot_product(&temp, &forward),
                -dot_product(&temp, &right),
                dot_product(&temp, &up),
            ];
        }

        trace.endpos[0] = start[0] + trace.fraction * (end[0] - start[0]);
        trace.endpos[1] = start[1] + trace.fraction * (end[1] - start[1]);
        trace.endpos[2] = start[2] + trace.fraction * (end[2] - start[2]);
        trace
    }

    // ============================================================
    // Point contents
    // ============================================================

    fn point_leafnum(&self, p: &Vec3) -> usize {
        let mut num = 0i32;
        while num >= 0 {
            let node = match self.nodes.get(num as usize) {
                Some(n) => n,
                None => return usize::MAX,
            };
            let plane = &self.planes[node.plane_idx];
            let d = if (plane.plane_type as usize) < 3 {
                p[plane.plane_type as usize] - plane.dist
            } else {
                dot_product(&plane.normal, p) - plane.dist
            };
            num = if d < 0.0 {
                node.children[1]
            } else {
                node.children[0]
            };
        }
        (-1 - num) as usize
    }

    fn point_in_brush(&self, p: &Vec3, brush_idx: usize) -> bool {
        let brush = &self.brushes[brush_idx];
        if brush.num_sides == 0 {
            return false;
        }
        for i in 0..brush.num_sides {
            let plane = &self.planes[self.brush_sides[brush.first_side + i].plane_idx];
            if dot_product(p, &plane.normal) - plane.dist > 0.0 {
                return false;
            }
        }
        true
    }

    /// OR of the content flags of every brush containing the point.
    pub fn point_contents(&mut self, p: &Vec3, model: ClipHandle) -> i32 {
        self.c_point_contents += 1;

        if model == BOX_MODEL_HANDLE {
            let idx = self.box_brush_idx;
            return if self.point_in_brush(p, idx) {
                self.brushes[idx].contents
            } else {
                0
            };
        }

        if model != 0 {
            if let Some(cm) = self.cmodels.get(model as usize) {
                let mut contents = 0;
                for k in 0..cm.num_brushes {
                    let idx = (cm.first_brush + k) as usize;
                    if idx < self.brushes.len() && self.point_in_brush(p, idx) {
                        contents |= self.brushes[idx].contents;
                    }
                }
                return contents;
            }
            return 0;
        }

        if self.nodes.is_empty() {
            return 0;
        }

        let leaf_idx = self.point_leafnum(p);
        let (first, count) = match self.leafs.get(leaf_idx) {
            Some(leaf) => (leaf.first_leaf_brush, leaf.num_leaf_brushes),
            None => return 0,
        };
        let mut contents = 0;
        for k in 0..count {
            let brush_num = match self.leaf_brushes.get((first + k) as usize) {
                Some(&b) if b >= 0 && (b as usize) < self.brushes.len() => b as usize,
                _ => continue,
            };
            let b = &self.brushes[brush_num];
            // quick reject on bounds before the side tests
            if (0..3).any(|j| p[j] < b.bounds[0][j] || p[j] > b.bounds[1][j]) {
                continue;
            }
            if self.point_in_brush(p, brush_num) {
                contents |= self.brushes[brush_num].contents;
            }
        }
        contents
    }

    pub fn transformed_point_contents(
        &mut self,
        p: &Vec3,
        model: ClipHandle,
        origin: &Vec3,
        angles: &Vec3,
    ) -> i32 {
        let mut p_l = vector_subtract(p, origin);
        if model != BOX_MODEL_HANDLE
            && (angles[0] != 0.0 || angles[1] != 0.0 || angles[2] != 0.0)
        {
            let mut forward = [0.0f32; 3];
            let mut right = [0.0f32; 3];
            let mut up = [0.0f32; 3];
            angle_vectors(angles, Some(&mut forward), Some(&mut right), Some(&mut up));
            let temp = p_l;
            p_l = [
                dot_product(&temp, &forward),
                -dot_product(&temp, &right),
                dot_product(&temp, &up),
            ];
        }
        self.point_contents(&p_l, model)
    }

    /// World bounds from inline model 0.
    pub fn world_bounds(&self) -> (Vec3, Vec3) {
        match self.cmodels.first() {
            Some(cm) => (cm.mins, cm.maxs),
            None => ([-MAX_WORLD_COORD; 3], [MAX_WORLD_COORD; 3]),
        }
    }
}

impl Default for CModelContext {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::q_shared::vector_ma;

    /// Build a minimal IBSP image: one shader, axial brushes, a
    /// single-node tree whose front child leaf holds every brush.
    fn build_bsp(brushes: &[([f32; 3], [f32; 3])]) -> Vec<u8> {
        let mut planes: Vec<([f32; 3], f32)> = Vec::new();
        let mut sides: Vec<i32> = Vec::new(); // plane index per side
        let mut brush_recs: Vec<(i32, i32)> = Vec::new(); // firstSide, numSides

        for (mins, maxs) in brushes {
            let first = sides.len() as i32;
            // axial side order the compiler emits: -x +x -y +y -z +z
            let side_planes = [
                ([-1.0, 0.0, 0.0], -mins[0]),
                ([1.0, 0.0, 0.0], maxs[0]),
                ([0.0, -1.0, 0.0], -mins[1]),
                ([0.0, 1.0, 0.0], maxs[1]),
                ([0.0, 0.0, -1.0], -mins[2]),
                ([0.0, 0.0, 1.0], maxs[2]),
            ];
            for p in side_planes {
                sides.push(planes.len() as i32);
                planes.push(p);
            }
            brush_recs.push((first, 6));
        }

        // one more plane for the tree's single node
        let node_plane = planes.len() as i32;
        planes.push(([0.0, 0.0, 1.0], -MAX_WORLD_COORD));

        let entities = b"{\n\"classname\" \"worldspawn\"\n}\n\0";

        let mut lump_data: Vec<Vec<u8>> = vec![Vec::new(); HEADER_LUMPS];

        lump_data[LUMP_ENTITIES] = entities.to_vec();

        // shaders: one solid shader
        let mut shader = vec![0u8; DSHADER_SIZE];
        shader[64..68].copy_from_slice(&0i32.to_le_bytes()); // surfaceFlags
        shader[68..72].copy_from_slice(&CONTENTS_SOLID.to_le_bytes());
        lump_data[LUMP_SHADERS] = shader;

        for (normal, dist) in &planes {
            for v in normal {
                lump_data[LUMP_PLANES].extend_from_slice(&v.to_le_bytes());
            }
            lump_data[LUMP_PLANES].extend_from_slice(&dist.to_le_bytes());
        }

        // node 0: everything in front -> leaf 0, behind -> leaf 1 (empty)
        let node = [node_plane, -1, -2, 0, 0, 0, 0, 0, 0];
        for v in node {
            lump_data[LUMP_NODES].extend_from_slice(&v.to_le_bytes());
        }

        // leaf 0 holds every brush, leaf 1 none
        let nbrushes = brush_recs.len() as i32;
        for (first, count) in [(0i32, nbrushes), (0, 0)] {
            let leaf = [-1, 0, 0, 0, 0, 0, 0, 0, 0, 0, first, count];
            for v in leaf {
                lump_data[LUMP_LEAFS].extend_from_slice(&v.to_le_bytes());
            }
        }

        for i in 0..nbrushes {
            lump_data[LUMP_LEAFBRUSHES].extend_from_slice(&i.to_le_bytes());
        }

        for (mins, maxs) in [([-1024.0f32; 3], [1024.0f32; 3])] {
            for v in mins {
                lump_data[LUMP_MODELS].extend_from_slice(&v.to_le_bytes());
            }
            for v in maxs {
                lump_data[LUMP_MODELS].extend_from_slice(&v.to_le_bytes());
            }
            for v in [0i32, 0, 0, nbrushes] {
                lump_data[LUMP_MODELS].extend_from_slice(&v.to_le_bytes());
            }
        }

        for (first, count) in &brush_recs {
            for v in [*first, *count, 0] {
                lump_data[LUMP_BRUSHES].extend_from_slice(&v.to_le_bytes());
            }
        }

        for plane_idx in &sides {
            lump_data[LUMP_BRUSHSIDES].extend_from_slice(&plane_idx.to_le_bytes());
            lump_data[LUMP_BRUSHSIDES].extend_from_slice(&0i32.to_le_bytes());
        }

        // assemble header + lumps
        let mut out = Vec::new();
        out.extend_from_slice(&BSP_IDENT.to_le_bytes());
        out.extend_from_slice(&BSP_VERSION.to_le_bytes());
        let mut ofs = 8 + HEADER_LUMPS * 8;
        let mut dir = Vec::new();
        for lump in &lump_data {
            dir.extend_from_slice(&(ofs as i32).to_le_bytes());
            dir.extend_from_slice(&(lump.len() as i32).to_le_bytes());
            ofs += lump.len();
        }
        out.extend_from_slice(&dir);
        for lump in &lump_data {
            out.extend_from_slice(lump);
        }
        out
    }

    fn unit_cube_world() -> CModelContext {
        let mut cm = CModelContext::new();
        let bsp = build_bsp(&[([0.0, 0.0, 0.0], [1.0, 1.0, 1.0])]);
        cm.load_map("maps/unit.bsp", &bsp).unwrap();
        cm
    }

    #[test]
    fn test_load_rejects_garbage() {
        let mut cm = CModelContext::new();
        assert!(matches!(
            cm.load_map("maps/x.bsp", b"shrt"),
            Err(WorldError::Truncated(_))
        ));
        let mut data = build_bsp(&[([0.0; 3], [1.0; 3])]);
        data[0] = b'X';
        assert!(matches!(
            cm.load_map("maps/x.bsp", &data),
            Err(WorldError::BadIdent(_))
        ));
        let mut data = build_bsp(&[([0.0; 3], [1.0; 3])]);
        data[4] = 45;
        assert!(matches!(
            cm.load_map("maps/x.bsp", &data),
            Err(WorldError::BadVersion(_, 45, _))
        ));
    }

    #[test]
    fn test_unloaded_world_traces_miss() {
        let mut cm = CModelContext::new();
        let tr = cm.box_trace(
            &[0.0; 3],
            &[100.0, 0.0, 0.0],
            &[0.0; 3],
            &[0.0; 3],
            0,
            CONTENTS_SOLID,
        );
        assert_eq!(tr.fraction, 1.0);
        assert!(!tr.startsolid && !tr.allsolid);
        assert_eq!(tr.endpos, [100.0, 0.0, 0.0]);
    }

    #[test]
    fn test_point_trace_against_unit_cube() {
        let mut cm = unit_cube_world();
        let start = [-1.0, 0.5, 0.5];
        let end = [2.0, 0.5, 0.5];
        let tr = cm.box_trace(&start, &end, &[0.0; 3], &[0.0; 3], 0, CONTENTS_SOLID);

        assert!((tr.fraction - 1.0 / 3.0).abs() < 0.05, "fraction {}", tr.fraction);
        assert_eq!(tr.plane.normal, [-1.0, 0.0, 0.0]);
        assert!(!tr.startsolid && !tr.allsolid);
        // endpos is the lerp of the original segment
        let expect = vector_ma(&start, tr.fraction, &vector_subtract(&end, &start));
        assert_eq!(tr.endpos, expect);
    }

    #[test]
    fn test_trace_miss_is_clean() {
        let mut cm = unit_cube_world();
        let tr = cm.box_trace(
            &[-1.0, 5.0, 0.5],
            &[2.0, 5.0, 0.5],
            &[0.0; 3],
            &[0.0; 3],
            0,
            CONTENTS_SOLID,
        );
        assert_eq!(tr.fraction, 1.0);
        assert!(!tr.startsolid && !tr.allsolid);
    }

    #[test]
    fn test_trace_idempotent() {
        let mut cm = unit_cube_world();
        let run = |cm: &mut CModelContext| {
            cm.box_trace(
                &[-2.0, 0.3, 0.4],
                &[3.0, 0.6, 0.7],
                &[-0.1; 3],
                &[0.1; 3],
                0,
                CONTENTS_SOLID,
            )
        };
        let a = run(&mut cm);
        let b = run(&mut cm);
        assert_eq!(a.fraction, b.fraction);
        assert_eq!(a.endpos, b.endpos);
        assert_eq!(a.plane.normal, b.plane.normal);
    }

    #[test]
    fn test_box_trace_expanded_planes() {
        let mut cm = unit_cube_world();
        // a 0.25-halfwidth box stops half a unit earlier than a point
        let tr = cm.box_trace(
            &[-2.0, 0.5, 0.5],
            &[2.0, 0.5, 0.5],
            &[-0.25; 3],
            &[0.25; 3],
            0,
            CONTENTS_SOLID,
        );
        assert!(tr.fraction < 1.0);
        assert!(tr.endpos[0] <= -0.25 + 0.01, "endpos {:?}", tr.endpos);
        assert_eq!(tr.plane.normal, [-1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_start_solid() {
        let mut cm = unit_cube_world();
        let tr = cm.box_trace(
            &[0.5, 0.5, 0.5],
            &[5.0, 0.5, 0.5],
            &[0.0; 3],
            &[0.0; 3],
            0,
            CONTENTS_SOLID,
        );
        assert!(tr.startsolid);
    }

    #[test]
    fn test_position_test_all_solid() {
        let mut cm = unit_cube_world();
        let p = [0.5, 0.5, 0.5];
        let tr = cm.box_trace(&p, &p, &[-0.1; 3], &[0.1; 3], 0, CONTENTS_SOLID);
        assert!(tr.allsolid && tr.startsolid);
        assert_eq!(tr.fraction, 0.0);
        let p = [5.0, 5.0, 5.0];
        let tr = cm.box_trace(&p, &p, &[-0.1; 3], &[0.1; 3], 0, CONTENTS_SOLID);
        assert!(!tr.allsolid && !tr.startsolid);
    }

    #[test]
    fn test_point_contents() {
        let mut cm = unit_cube_world();
        assert_eq!(cm.point_contents(&[0.5, 0.5, 0.5], 0), CONTENTS_SOLID);
        assert_eq!(cm.point_contents(&[2.0, 0.5, 0.5], 0), 0);
    }

    #[test]
    fn test_temp_box_model() {
        let mut cm = CModelContext::new(); // no world needed
        let handle = cm.temp_box_model(&[-8.0; 3], &[8.0; 3]);
        let tr = cm.box_trace(
            &[-32.0, 0.0, 0.0],
            &[32.0, 0.0, 0.0],
            &[0.0; 3],
            &[0.0; 3],
            handle,
            CONTENTS_SOLID,
        );
        // enters the box face at x = -8: fraction 24/64
        assert!((tr.fraction - 24.0 / 64.0).abs() < 0.01, "{}", tr.fraction);
        assert_eq!(tr.plane.normal, [-1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_transformed_trace_translation() {
        let mut cm = CModelContext::new();
        let handle = cm.temp_box_model(&[-8.0; 3], &[8.0; 3]);
        // box entity sitting at x = 100
        let tr = cm.transformed_box_trace(
            &[0.0, 0.0, 0.0],
            &[200.0, 0.0, 0.0],
            &[0.0; 3],
            &[0.0; 3],
            handle,
            CONTENTS_SOLID,
            &[100.0, 0.0, 0.0],
            &[0.0; 3],
        );
        assert!((tr.endpos[0] - 92.0).abs() < 0.5, "endpos {:?}", tr.endpos);
    }

    #[test]
    fn test_entity_token_stream() {
        let mut cm = unit_cube_world();
        assert_eq!(cm.next_entity_token().as_deref(), Some("{"));
        assert_eq!(cm.next_entity_token().as_deref(), Some("classname"));
        assert_eq!(cm.next_entity_token().as_deref(), Some("worldspawn"));
        assert_eq!(cm.next_entity_token().as_deref(), Some("}"));
        cm.rewind_entity_tokens();
        assert_eq!(cm.next_entity_token().as_deref(), Some("{"));
    }

    #[test]
    fn test_checksum_stable() {
        let bsp = build_bsp(&[([0.0; 3], [1.0; 3])]);
        let mut cm = CModelContext::new();
        let a = cm.load_map("maps/unit.bsp", &bsp).unwrap();
        let b = cm.load_map("maps/unit.bsp", &bsp).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, 0);
    }
}
