//! Output vertex format catalog.
//!
//! Closed set of GPU vertex layouts. Each format is described by a
//! static table of destination fields: which source stream feeds it,
//! how the value is encoded, and at which byte offset it lands inside
//! the interleaved vertex record.

use crate::import::ImportChunk;
use crate::quantize::QuantizationHelper;
use crate::stream::MeshStreamKind;

/// Encoding of one field inside an interleaved output vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackedFormat {
    /// 3 x f32, 12 bytes.
    Float3,
    /// 2 x f32, 8 bytes.
    Float2,
    /// 2 x f16, 4 bytes.
    Half2,
    /// 4 x u8 normalized to [0, 1], 4 bytes.
    UnormByte4,
    /// 4 x u8 integer, 4 bytes.
    UintByte4,
    /// Unit vector packed 11/11/10 bits into a u32, 4 bytes.
    PackedUnitVec,
    /// Position quantized 22/22/20 bits into a u64, 8 bytes.
    PackedPosition,
}

impl PackedFormat {
    /// Encoded size in bytes.
    pub fn size(&self) -> usize {
        match self {
            Self::Float3 => 12,
            Self::Float2 | Self::PackedPosition => 8,
            Self::Half2 | Self::UnormByte4 | Self::UintByte4 | Self::PackedUnitVec => 4,
        }
    }
}

/// One destination field of an output vertex layout.
#[derive(Debug, Clone, Copy)]
pub struct FormatField {
    /// Source stream feeding this field.
    pub source: MeshStreamKind,
    /// Encoding applied while gathering.
    pub packing: PackedFormat,
    /// Byte offset inside the vertex record.
    pub offset: usize,
}

/// Static description of one output vertex layout.
#[derive(Debug)]
pub struct VertexFormatInfo {
    /// Human-readable layout name for diagnostics.
    pub name: &'static str,
    /// Size of one interleaved vertex record in bytes.
    pub stride: usize,
    /// Whether positions are stored in the quantized fixed-point encoding.
    pub quantized_position: bool,
    /// Ordered destination fields.
    pub fields: &'static [FormatField],
}

const fn field(source: MeshStreamKind, packing: PackedFormat, offset: usize) -> FormatField {
    FormatField {
        source,
        packing,
        offset,
    }
}

static POSITION_ONLY: VertexFormatInfo = VertexFormatInfo {
    name: "PositionOnly",
    stride: 12,
    quantized_position: false,
    fields: &[field(MeshStreamKind::Position, PackedFormat::Float3, 0)],
};

static STATIC: VertexFormatInfo = VertexFormatInfo {
    name: "Static",
    stride: 24,
    quantized_position: true,
    fields: &[
        field(MeshStreamKind::Position, PackedFormat::PackedPosition, 0),
        field(MeshStreamKind::Normal, PackedFormat::PackedUnitVec, 8),
        field(MeshStreamKind::Tangent, PackedFormat::PackedUnitVec, 12),
        field(MeshStreamKind::Binormal, PackedFormat::PackedUnitVec, 16),
        field(MeshStreamKind::TexCoord0, PackedFormat::Half2, 20),
    ],
};

static STATIC_EX: VertexFormatInfo = VertexFormatInfo {
    name: "StaticEx",
    stride: 40,
    quantized_position: false,
    fields: &[
        field(MeshStreamKind::Position, PackedFormat::Float3, 0),
        field(MeshStreamKind::Normal, PackedFormat::PackedUnitVec, 12),
        field(MeshStreamKind::Tangent, PackedFormat::PackedUnitVec, 16),
        field(MeshStreamKind::Binormal, PackedFormat::PackedUnitVec, 20),
        field(MeshStreamKind::TexCoord0, PackedFormat::Float2, 24),
        field(MeshStreamKind::TexCoord1, PackedFormat::Half2, 32),
        field(MeshStreamKind::Color0, PackedFormat::UnormByte4, 36),
    ],
};

static SKINNED4: VertexFormatInfo = VertexFormatInfo {
    name: "Skinned4",
    stride: 40,
    quantized_position: false,
    fields: &[
        field(MeshStreamKind::Position, PackedFormat::Float3, 0),
        field(MeshStreamKind::Normal, PackedFormat::PackedUnitVec, 12),
        field(MeshStreamKind::Tangent, PackedFormat::PackedUnitVec, 16),
        field(MeshStreamKind::Binormal, PackedFormat::PackedUnitVec, 20),
        field(MeshStreamKind::TexCoord0, PackedFormat::Float2, 24),
        field(MeshStreamKind::SkinIndices, PackedFormat::UintByte4, 32),
        field(MeshStreamKind::SkinWeights, PackedFormat::UnormByte4, 36),
    ],
};

static SKINNED4_EX: VertexFormatInfo = VertexFormatInfo {
    name: "Skinned4Ex",
    stride: 48,
    quantized_position: false,
    fields: &[
        field(MeshStreamKind::Position, PackedFormat::Float3, 0),
        field(MeshStreamKind::Normal, PackedFormat::PackedUnitVec, 12),
        field(MeshStreamKind::Tangent, PackedFormat::PackedUnitVec, 16),
        field(MeshStreamKind::Binormal, PackedFormat::PackedUnitVec, 20),
        field(MeshStreamKind::TexCoord0, PackedFormat::Float2, 24),
        field(MeshStreamKind::TexCoord1, PackedFormat::Half2, 32),
        field(MeshStreamKind::Color0, PackedFormat::UnormByte4, 36),
        field(MeshStreamKind::SkinIndices, PackedFormat::UintByte4, 40),
        field(MeshStreamKind::SkinWeights, PackedFormat::UnormByte4, 44),
    ],
};

/// Supported output vertex layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshVertexFormat {
    /// Position only, for depth-only or occlusion geometry.
    PositionOnly,
    /// Quantized static geometry, the default cooking target.
    Static,
    /// Full-precision static geometry with a second UV set and color.
    StaticEx,
    /// Four-bone skinned geometry.
    Skinned4,
    /// Four-bone skinned geometry with a second UV set and color.
    Skinned4Ex,
}

impl MeshVertexFormat {
    /// Layout description for this format.
    pub fn info(&self) -> &'static VertexFormatInfo {
        match self {
            Self::PositionOnly => &POSITION_ONLY,
            Self::Static => &STATIC,
            Self::StaticEx => &STATIC_EX,
            Self::Skinned4 => &SKINNED4,
            Self::Skinned4Ex => &SKINNED4_EX,
        }
    }

    /// Size of one vertex record in bytes.
    pub fn stride(&self) -> usize {
        self.info().stride
    }
}

/// Gathers a chunk's attribute streams into interleaved output vertices.
///
/// `dst` is the destination slice for exactly this chunk's vertices
/// (`vertex_count * stride` bytes). Fields whose source stream is absent
/// receive encoding defaults: opaque white for colors, zeros otherwise.
///
/// `quantizer` must be provided for formats with quantized positions.
pub fn pack_vertex_data(
    chunk: &ImportChunk,
    format: MeshVertexFormat,
    quantizer: Option<&QuantizationHelper>,
    dst: &mut [u8],
) {
    let info = format.info();
    let vertex_count = chunk.vertex_count as usize;
    assert_eq!(
        dst.len(),
        vertex_count * info.stride,
        "destination size does not match {} layout",
        info.name
    );

    for f in info.fields {
        match chunk.vertex_stream(f.source) {
            Some(stream) => pack_field(
                stream.kind.stride(),
                &stream.data,
                f,
                info.stride,
                quantizer,
                dst,
            ),
            None => fill_field(f, info.stride, vertex_count, dst),
        }
    }
}

fn pack_field(
    src_stride: usize,
    src: &[u8],
    f: &FormatField,
    dst_stride: usize,
    quantizer: Option<&QuantizationHelper>,
    dst: &mut [u8],
) {
    let count = src.len() / src_stride;
    match f.packing {
        PackedFormat::Float3 => {
            debug_assert_eq!(src_stride, 12);
            for i in 0..count {
                let at = i * dst_stride + f.offset;
                dst[at..at + 12].copy_from_slice(&src[i * 12..i * 12 + 12]);
            }
        }
        PackedFormat::Float2 => {
            debug_assert_eq!(src_stride, 8);
            for i in 0..count {
                let at = i * dst_stride + f.offset;
                dst[at..at + 8].copy_from_slice(&src[i * 8..i * 8 + 8]);
            }
        }
        PackedFormat::Half2 => {
            debug_assert_eq!(src_stride, 8);
            let values: &[[f32; 2]] = bytemuck::cast_slice(src);
            for (i, v) in values.iter().enumerate() {
                let halves = [f32_to_f16(v[0]), f32_to_f16(v[1])];
                let at = i * dst_stride + f.offset;
                dst[at..at + 4].copy_from_slice(bytemuck::bytes_of(&halves));
            }
        }
        PackedFormat::UnormByte4 => {
            if src_stride == 16 {
                // float weights normalized into bytes
                let values: &[[f32; 4]] = bytemuck::cast_slice(src);
                for (i, v) in values.iter().enumerate() {
                    let bytes = [
                        unorm_byte(v[0]),
                        unorm_byte(v[1]),
                        unorm_byte(v[2]),
                        unorm_byte(v[3]),
                    ];
                    let at = i * dst_stride + f.offset;
                    dst[at..at + 4].copy_from_slice(&bytes);
                }
            } else {
                debug_assert_eq!(src_stride, 4);
                for i in 0..count {
                    let at = i * dst_stride + f.offset;
                    dst[at..at + 4].copy_from_slice(&src[i * 4..i * 4 + 4]);
                }
            }
        }
        PackedFormat::UintByte4 => {
            debug_assert_eq!(src_stride, 4);
            for i in 0..count {
                let at = i * dst_stride + f.offset;
                dst[at..at + 4].copy_from_slice(&src[i * 4..i * 4 + 4]);
            }
        }
        PackedFormat::PackedUnitVec => {
            debug_assert_eq!(src_stride, 12);
            let values: &[[f32; 3]] = bytemuck::cast_slice(src);
            for (i, v) in values.iter().enumerate() {
                let packed = pack_unit_vector(v[0], v[1], v[2]);
                let at = i * dst_stride + f.offset;
                dst[at..at + 4].copy_from_slice(&packed.to_ne_bytes());
            }
        }
        PackedFormat::PackedPosition => {
            debug_assert_eq!(src_stride, 12);
            let quantizer = quantizer
                .expect("quantized vertex format packed without a quantization helper");
            let values: &[[f32; 3]] = bytemuck::cast_slice(src);
            for (i, v) in values.iter().enumerate() {
                let packed =
                    quantizer.quantize_position(meshforge_core::math::Vec3::new(v[0], v[1], v[2]));
                let at = i * dst_stride + f.offset;
                dst[at..at + 8].copy_from_slice(&packed.to_ne_bytes());
            }
        }
    }
}

fn fill_field(f: &FormatField, dst_stride: usize, vertex_count: usize, dst: &mut [u8]) {
    let white = [0xffu8; 12];
    let zero = [0u8; 12];
    let is_color = matches!(
        f.source,
        MeshStreamKind::Color0
            | MeshStreamKind::Color1
            | MeshStreamKind::Color2
            | MeshStreamKind::Color3
    );
    let default = if is_color { &white } else { &zero };
    let size = f.packing.size();
    for i in 0..vertex_count {
        let at = i * dst_stride + f.offset;
        dst[at..at + size].copy_from_slice(&default[..size]);
    }
}

fn unorm_byte(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Packs a unit vector into 11/11/10 bits.
///
/// Components are mapped from [-1, 1] onto the unsigned bit range.
pub fn pack_unit_vector(x: f32, y: f32, z: f32) -> u32 {
    let qx = (1023.5 + x * 1023.5).round().clamp(0.0, 2047.0) as u32;
    let qy = (1023.5 + y * 1023.5).round().clamp(0.0, 2047.0) as u32;
    let qz = (511.5 + z * 511.5).round().clamp(0.0, 1023.0) as u32;
    qx | (qy << 11) | (qz << 22)
}

/// Inverse of [`pack_unit_vector`], up to encoding resolution.
pub fn unpack_unit_vector(packed: u32) -> [f32; 3] {
    let x = ((packed & 0x7ff) as f32 - 1023.5) / 1023.5;
    let y = (((packed >> 11) & 0x7ff) as f32 - 1023.5) / 1023.5;
    let z = (((packed >> 22) & 0x3ff) as f32 - 511.5) / 511.5;
    [x, y, z]
}

/// Converts an f32 to IEEE 754 binary16 bits, round to nearest.
pub fn f32_to_f16(value: f32) -> u16 {
    let bits = value.to_bits();
    let sign = ((bits >> 16) & 0x8000) as u16;
    let exp_mant = bits & 0x7fff_ffff;

    if exp_mant > 0x7f80_0000 {
        return sign | 0x7e00; // NaN
    }
    if exp_mant >= 0x4780_0000 {
        return sign | 0x7c00; // overflow to infinity
    }
    if exp_mant < 0x3880_0000 {
        // subnormal half range
        if exp_mant < 0x3300_0000 {
            return sign; // flush to zero
        }
        let shift = 126 - (exp_mant >> 23);
        let mant = (exp_mant & 0x007f_ffff) | 0x0080_0000;
        return sign | ((mant + (1 << (shift - 1))) >> shift) as u16;
    }

    // normal range: rebias exponent 127 -> 15, round mantissa to 10 bits
    let rebased = exp_mant - 0x3800_0000;
    sign | ((rebased + 0xfff + ((rebased >> 13) & 1)) >> 13) as u16
}

/// Converts IEEE 754 binary16 bits to f32.
pub fn f16_to_f32(half: u16) -> f32 {
    let sign = if half & 0x8000 != 0 { -1.0f32 } else { 1.0 };
    let exp = (half >> 10) & 0x1f;
    let mant = (half & 0x3ff) as f32;
    match exp {
        0 => sign * mant * (-24f32).exp2(),
        0x1f => {
            if mant == 0.0 {
                sign * f32::INFINITY
            } else {
                f32::NAN
            }
        }
        _ => sign * (1024.0 + mant) * ((exp as i32 - 25) as f32).exp2(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(MeshVertexFormat::PositionOnly, 12)]
    #[case(MeshVertexFormat::Static, 24)]
    #[case(MeshVertexFormat::StaticEx, 40)]
    #[case(MeshVertexFormat::Skinned4, 40)]
    #[case(MeshVertexFormat::Skinned4Ex, 48)]
    fn format_strides(#[case] format: MeshVertexFormat, #[case] stride: usize) {
        assert_eq!(format.stride(), stride);
    }

    #[test]
    fn only_static_format_quantizes_positions() {
        for format in [
            MeshVertexFormat::PositionOnly,
            MeshVertexFormat::Static,
            MeshVertexFormat::StaticEx,
            MeshVertexFormat::Skinned4,
            MeshVertexFormat::Skinned4Ex,
        ] {
            let expected = format == MeshVertexFormat::Static;
            assert_eq!(format.info().quantized_position, expected);
        }
    }

    #[test]
    fn fields_stay_inside_stride() {
        for format in [
            MeshVertexFormat::PositionOnly,
            MeshVertexFormat::Static,
            MeshVertexFormat::StaticEx,
            MeshVertexFormat::Skinned4,
            MeshVertexFormat::Skinned4Ex,
        ] {
            let info = format.info();
            for f in info.fields {
                assert!(f.offset + f.packing.size() <= info.stride, "{}", info.name);
                assert_eq!(f.offset % 4, 0, "{}", info.name);
            }
        }
    }

    #[rstest]
    #[case(0.0)]
    #[case(1.0)]
    #[case(-1.0)]
    #[case(0.5)]
    #[case(65504.0)]
    #[case(-0.333251953125)]
    fn f16_round_trips_exact_values(#[case] value: f32) {
        assert_eq!(f16_to_f32(f32_to_f16(value)), value);
    }

    #[test]
    fn f16_overflow_saturates_to_infinity() {
        assert_eq!(f32_to_f16(1.0e9), 0x7c00);
        assert_eq!(f32_to_f16(-1.0e9), 0xfc00);
        assert_eq!(f32_to_f16(65520.0), 0x7c00);
    }

    #[test]
    fn f16_small_values_round_via_subnormals() {
        let value = (-20f32).exp2();
        let back = f16_to_f32(f32_to_f16(value));
        assert!((back - value).abs() <= (-24f32).exp2());
    }

    #[test]
    fn unit_vector_pack_round_trips() {
        for v in [
            [0.0f32, 0.0, 1.0],
            [1.0, 0.0, 0.0],
            [0.0, -1.0, 0.0],
            [0.577, 0.577, -0.577],
        ] {
            let [x, y, z] = unpack_unit_vector(pack_unit_vector(v[0], v[1], v[2]));
            assert!((x - v[0]).abs() < 2.0 / 1023.0);
            assert!((y - v[1]).abs() < 2.0 / 1023.0);
            assert!((z - v[2]).abs() < 2.0 / 511.0);
        }
    }
}
