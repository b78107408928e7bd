//! Document layout: blocks of fields made of scan boxes.
//!
//! The layout is supplied by the caller (typically deserialized from a
//! template document) and is treated as immutable for the duration of a run.
//! Positional corrections are applied to copies via [`Template::with_shifts`].

use serde::{Deserialize, Serialize};

use crate::domain::shift::ValidatedShift;
use crate::processors::geometry::{BoundingBox, Dimensions, Point};

/// One markable item on the sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanBox {
    /// Value the item contributes to a response when marked.
    pub label: String,
    /// Unshifted top-left corner, in page pixels.
    pub position: Point,
    pub dimensions: Dimensions,
}

impl ScanBox {
    pub fn new(label: impl Into<String>, position: Point, dimensions: Dimensions) -> Self {
        Self {
            label: label.into(),
            position,
            dimensions,
        }
    }

    /// Page region of the item after applying `shift`.
    pub fn bbox(&self, shift: Point) -> BoundingBox {
        BoundingBox::from_origin(self.position.translated(shift.x, shift.y), self.dimensions)
    }
}

/// A logical answer unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub id: String,
    pub label: String,
    pub items: Vec<ScanBox>,
}

impl Field {
    pub fn new(id: impl Into<String>, label: impl Into<String>, items: Vec<ScanBox>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            items,
        }
    }

    /// Union of the field's item boxes after applying `shift`.
    ///
    /// Returns `None` for a field without items.
    pub fn bbox(&self, shift: Point) -> Option<BoundingBox> {
        self.items
            .iter()
            .map(|item| item.bbox(shift))
            .reduce(|acc, b| {
                BoundingBox::from_coords(
                    acc.x_min.min(b.x_min),
                    acc.y_min.min(b.y_min),
                    acc.x_max.max(b.x_max),
                    acc.y_max.max(b.y_max),
                )
            })
    }
}

/// A spatial group of fields that moves as one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldBlock {
    pub name: String,
    /// Unshifted top-left corner.
    pub origin: Point,
    pub dimensions: Dimensions,
    pub fields: Vec<Field>,
    /// Correction applied to every item of the block.
    #[serde(default)]
    pub shift: Point,
}

impl FieldBlock {
    pub fn new(
        name: impl Into<String>,
        origin: Point,
        dimensions: Dimensions,
        fields: Vec<Field>,
    ) -> Self {
        Self {
            name: name.into(),
            origin,
            dimensions,
            fields,
            shift: Point::default(),
        }
    }

    /// Block region with the current shift applied.
    pub fn bbox(&self) -> BoundingBox {
        BoundingBox::from_origin(self.origin.translated(self.shift.x, self.shift.y), self.dimensions)
    }

    /// Block region ignoring any shift.
    pub fn unshifted_bbox(&self) -> BoundingBox {
        BoundingBox::from_origin(self.origin, self.dimensions)
    }
}

fn default_empty_value() -> String {
    String::new()
}

/// The full sheet layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub blocks: Vec<FieldBlock>,
    /// Response used for fields with no usable mark.
    #[serde(default = "default_empty_value")]
    pub empty_value: String,
}

impl Template {
    pub fn new(blocks: Vec<FieldBlock>) -> Self {
        Self {
            blocks,
            empty_value: default_empty_value(),
        }
    }

    pub fn with_empty_value(mut self, empty_value: impl Into<String>) -> Self {
        self.empty_value = empty_value.into();
        self
    }

    /// Iterates every field together with its owning block.
    pub fn fields(&self) -> impl Iterator<Item = (&FieldBlock, &Field)> {
        self.blocks
            .iter()
            .flat_map(|block| block.fields.iter().map(move |field| (block, field)))
    }

    pub fn field_count(&self) -> usize {
        self.blocks.iter().map(|b| b.fields.len()).sum()
    }

    pub fn block(&self, name: &str) -> Option<&FieldBlock> {
        self.blocks.iter().find(|b| b.name == name)
    }

    /// Returns a copy with `shifts` added to the named blocks.
    ///
    /// Shifts naming an unknown block are ignored. `self` is never modified.
    pub fn with_shifts(&self, shifts: &[ValidatedShift]) -> Template {
        let mut shifted = self.clone();
        for shift in shifts {
            if let Some(block) = shifted
                .blocks
                .iter_mut()
                .find(|b| b.name == shift.block_name)
            {
                block.shift = block.shift.translated(shift.dx, shift.dy);
            }
        }
        shifted
    }
}
