//! Shader programs and vertex input layouts
//!
//! A shader program pairs a vertex and a pixel stage in one WGSL source and
//! declares the vertex attributes it consumes as a semantic list. The input
//! layout is computed from the fixed semantic table of the full vertex.

use crate::backend::types::{FullVertex, VertexAttribute, VertexBufferLayout, VertexFormat};

/// Vertex attribute semantics of the standard full-vertex layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexSemantic {
    Position,
    Normal,
    Color3,
    Color4,
    TexCoord0,
    TexCoord1,
    TexCoord2,
}

impl VertexSemantic {
    /// Byte offset within the full vertex
    pub fn offset(&self) -> u64 {
        match self {
            VertexSemantic::Position => 0,
            VertexSemantic::Normal => 12,
            VertexSemantic::Color3 | VertexSemantic::Color4 => 24,
            VertexSemantic::TexCoord0 => 40,
            VertexSemantic::TexCoord1 => 48,
            VertexSemantic::TexCoord2 => 56,
        }
    }

    /// Size in bytes
    pub fn size(&self) -> u64 {
        match self {
            VertexSemantic::Position | VertexSemantic::Normal | VertexSemantic::Color3 => 12,
            VertexSemantic::Color4 => 16,
            VertexSemantic::TexCoord0 | VertexSemantic::TexCoord1 | VertexSemantic::TexCoord2 => 8,
        }
    }

    pub fn format(&self) -> VertexFormat {
        match self {
            VertexSemantic::Position | VertexSemantic::Normal | VertexSemantic::Color3 => {
                VertexFormat::Float32x3
            }
            VertexSemantic::Color4 => VertexFormat::Float32x4,
            VertexSemantic::TexCoord0 | VertexSemantic::TexCoord1 | VertexSemantic::TexCoord2 => {
                VertexFormat::Float32x2
            }
        }
    }
}

/// An opaque vertex+pixel program pair with its declared attribute list
#[derive(Debug, Clone)]
pub struct ShaderProgram {
    pub name: String,
    /// WGSL source containing `vs_main` and `fs_main`
    pub source: String,
    pub vertex_semantics: Vec<VertexSemantic>,
}

impl ShaderProgram {
    pub fn new(name: &str, source: &str, vertex_semantics: Vec<VertexSemantic>) -> Self {
        Self {
            name: name.to_string(),
            source: source.to_string(),
            vertex_semantics,
        }
    }

    /// Input layout over the shared full-vertex buffer: one attribute per
    /// declared semantic, shader locations in declaration order.
    pub fn input_layout(&self) -> VertexBufferLayout {
        VertexBufferLayout {
            array_stride: FullVertex::STRIDE,
            attributes: self
                .vertex_semantics
                .iter()
                .enumerate()
                .map(|(location, semantic)| VertexAttribute {
                    location: location as u32,
                    format: semantic.format(),
                    offset: semantic.offset(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn semantic_table_offsets_and_sizes() {
        assert_eq!((VertexSemantic::Position.offset(), VertexSemantic::Position.size()), (0, 12));
        assert_eq!((VertexSemantic::Normal.offset(), VertexSemantic::Normal.size()), (12, 12));
        assert_eq!((VertexSemantic::Color3.offset(), VertexSemantic::Color3.size()), (24, 12));
        assert_eq!((VertexSemantic::Color4.offset(), VertexSemantic::Color4.size()), (24, 16));
        assert_eq!((VertexSemantic::TexCoord0.offset(), VertexSemantic::TexCoord0.size()), (40, 8));
        assert_eq!((VertexSemantic::TexCoord1.offset(), VertexSemantic::TexCoord1.size()), (48, 8));
        assert_eq!((VertexSemantic::TexCoord2.offset(), VertexSemantic::TexCoord2.size()), (56, 8));
    }

    #[test]
    fn input_layout_follows_declaration_order() {
        let program = ShaderProgram::new(
            "standard",
            "",
            vec![
                VertexSemantic::Position,
                VertexSemantic::Normal,
                VertexSemantic::Color4,
                VertexSemantic::TexCoord0,
            ],
        );

        let layout = program.input_layout();
        assert_eq!(layout.array_stride, 64);
        assert_eq!(layout.attributes.len(), 4);
        assert_eq!(layout.attributes[0].location, 0);
        assert_eq!(layout.attributes[0].offset, 0);
        assert_eq!(layout.attributes[2].format, VertexFormat::Float32x4);
        assert_eq!(layout.attributes[3].offset, 40);
    }
}
