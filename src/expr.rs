//! Earth Engine REST expression graphs.
//!
//! The REST API evaluates an [`Expression`]: a table of value nodes plus the
//! key of the result node. Invocation arguments may nest inline, so every
//! builder here returns a [`ValueNode`] tree. Function definitions must point
//! at their body by key; [`Expression::new`] lifts those bodies into the table.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Name of the mapping variable used in `Collection.map` bodies.
const MAP_ARGUMENT: &str = "_MAPPING_VAR_0_0";

/// A complete expression submitted to the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    /// Key of the node in `values` holding the result.
    pub result: String,
    /// Value nodes by key.
    pub values: BTreeMap<String, ValueNode>,
}

impl Expression {
    /// Wrap a node tree as an expression, lifting function bodies into the
    /// value table.
    #[must_use]
    pub fn new(mut node: ValueNode) -> Self {
        let mut values = BTreeMap::new();
        lift_bodies(&mut node, &mut values);
        values.insert("0".to_string(), node);
        Self { result: "0".to_string(), values }
    }

    /// The result node.
    #[cfg(test)]
    #[must_use]
    pub fn root(&self) -> Option<&ValueNode> {
        self.values.get(&self.result)
    }
}

/// One node of an expression graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueNode {
    /// A literal JSON value.
    ConstantValue(serde_json::Value),
    /// A list of nodes.
    ArrayValue {
        /// Elements.
        values: Vec<ValueNode>,
    },
    /// A call to a named API function.
    FunctionInvocationValue(FunctionInvocation),
    /// An anonymous function, used as a `Collection.map` body.
    FunctionDefinitionValue(FunctionDefinition),
    /// A reference to an argument of the enclosing function definition.
    ArgumentReference(String),
}

/// Invocation of an API function with named arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionInvocation {
    /// API function name, e.g. `Collection.filter`.
    pub function_name: String,
    /// Arguments by name.
    pub arguments: BTreeMap<String, ValueNode>,
}

/// Anonymous function definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionDefinition {
    /// Names of the arguments.
    pub argument_names: Vec<String>,
    /// Key of the body node in the expression's value table.
    pub body: String,
    /// Body held in the tree until [`Expression::new`] lifts it.
    #[serde(skip)]
    pending_body: Option<Box<ValueNode>>,
}

/// Move every pending function body into `values` under a fresh key.
fn lift_bodies(node: &mut ValueNode, values: &mut BTreeMap<String, ValueNode>) {
    match node {
        ValueNode::FunctionInvocationValue(f) => {
            for argument in f.arguments.values_mut() {
                lift_bodies(argument, values);
            }
        }
        ValueNode::ArrayValue { values: items } => {
            for item in items {
                lift_bodies(item, values);
            }
        }
        ValueNode::FunctionDefinitionValue(def) => {
            if let Some(mut body) = def.pending_body.take() {
                lift_bodies(&mut body, values);
                // "0" is reserved for the result node.
                let key = (values.len() + 1).to_string();
                def.body.clone_from(&key);
                values.insert(key, *body);
            }
        }
        ValueNode::ConstantValue(_) | ValueNode::ArgumentReference(_) => {}
    }
}

impl ValueNode {
    /// A constant node.
    pub fn constant(value: impl Into<serde_json::Value>) -> Self {
        Self::ConstantValue(value.into())
    }

    /// Name of the invoked function, if this is an invocation.
    #[cfg(test)]
    #[must_use]
    pub fn function_name(&self) -> Option<&str> {
        match self {
            Self::FunctionInvocationValue(f) => Some(&f.function_name),
            _ => None,
        }
    }

    /// Argument of an invocation by name.
    #[cfg(test)]
    #[must_use]
    pub fn argument(&self, name: &str) -> Option<&ValueNode> {
        match self {
            Self::FunctionInvocationValue(f) => f.arguments.get(name),
            _ => None,
        }
    }

    /// Body of a function definition that has not been lifted yet.
    #[cfg(test)]
    #[must_use]
    pub fn pending_body(&self) -> Option<&ValueNode> {
        match self {
            Self::FunctionDefinitionValue(def) => def.pending_body.as_deref(),
            _ => None,
        }
    }
}

/// Build an invocation node from `(name, node)` pairs.
fn invoke<const N: usize>(function_name: &str, arguments: [(&str, ValueNode); N]) -> ValueNode {
    ValueNode::FunctionInvocationValue(FunctionInvocation {
        function_name: function_name.to_string(),
        arguments: arguments.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
    })
}

/// `ee.ImageCollection(id)`.
#[must_use]
pub fn load_collection(id: &str) -> ValueNode {
    invoke("ImageCollection.load", [("id", ValueNode::constant(id))])
}

/// `ee.Date(millis)`.
#[must_use]
pub fn date(millis: i64) -> ValueNode {
    invoke("Date", [("value", ValueNode::constant(millis))])
}

/// `collection.filterDate(start, end)`, half-open on `system:time_start`.
#[must_use]
pub fn filter_date(collection: ValueNode, start_millis: i64, end_millis: i64) -> ValueNode {
    let range = invoke("DateRange", [("start", date(start_millis)), ("end", date(end_millis))]);
    let filter = invoke(
        "Filter.dateRangeContains",
        [("leftValue", range), ("rightField", ValueNode::constant("system:time_start"))],
    );
    filter_collection(collection, filter)
}

/// `collection.filter(ee.Filter.eq(property, value))`.
#[must_use]
pub fn filter_eq(collection: ValueNode, property: &str, value: &str) -> ValueNode {
    let filter = invoke(
        "Filter.equals",
        [("leftField", ValueNode::constant(property)), ("rightValue", ValueNode::constant(value))],
    );
    filter_collection(collection, filter)
}

fn filter_collection(collection: ValueNode, filter: ValueNode) -> ValueNode {
    invoke("Collection.filter", [("collection", collection), ("filter", filter)])
}

/// `first.merge(second)`.
#[must_use]
pub fn merge(first: ValueNode, second: ValueNode) -> ValueNode {
    invoke("ImageCollection.merge", [("collection1", first), ("collection2", second)])
}

/// `collection.map(body)` where `body` receives the image as
/// [`map_argument`].
#[must_use]
pub fn map(collection: ValueNode, body: ValueNode) -> ValueNode {
    let algorithm = ValueNode::FunctionDefinitionValue(FunctionDefinition {
        argument_names: vec![MAP_ARGUMENT.to_string()],
        body: String::new(),
        pending_body: Some(Box::new(body)),
    });
    invoke("Collection.map", [("collection", collection), ("baseAlgorithm", algorithm)])
}

/// Reference to the image inside a [`map`] body.
#[must_use]
pub fn map_argument() -> ValueNode {
    ValueNode::ArgumentReference(MAP_ARGUMENT.to_string())
}

/// `collection.select(bands)`.
#[must_use]
pub fn select_collection(collection: ValueNode, bands: &[String]) -> ValueNode {
    map(collection, select_image(map_argument(), bands))
}

/// `image.select(bands)`.
#[must_use]
pub fn select_image(image: ValueNode, bands: &[String]) -> ValueNode {
    let selectors = ValueNode::ArrayValue {
        values: bands.iter().map(|b| ValueNode::constant(b.as_str())).collect(),
    };
    invoke("Image.select", [("input", image), ("bandSelectors", selectors)])
}

/// `collection.mosaic()`.
#[must_use]
pub fn mosaic(collection: ValueNode) -> ValueNode {
    invoke("ImageCollection.mosaic", [("collection", collection)])
}

/// `image.neq(value)`.
#[must_use]
pub fn neq(image: ValueNode, value: i64) -> ValueNode {
    let constant = invoke("Image.constant", [("value", ValueNode::constant(value))]);
    invoke("Image.neq", [("image1", image), ("image2", constant)])
}

/// `image.updateMask(mask)`.
#[must_use]
pub fn update_mask(image: ValueNode, mask: ValueNode) -> ValueNode {
    invoke("Image.updateMask", [("image", image), ("mask", mask)])
}

/// `collection.size()`.
#[must_use]
pub fn size(collection: ValueNode) -> ValueNode {
    invoke("Collection.size", [("collection", collection)])
}

/// `collection.first()`.
#[must_use]
pub fn first(collection: ValueNode) -> ValueNode {
    invoke("Collection.first", [("collection", collection)])
}

/// `element.get(property)`.
#[must_use]
pub fn get_property(element: ValueNode, property: &str) -> ValueNode {
    invoke("Element.get", [("object", element), ("property", ValueNode::constant(property))])
}

/// `ee.Geometry.Point([lon, lat])`.
#[must_use]
pub fn point(lon: f64, lat: f64) -> ValueNode {
    invoke("GeometryConstructors.Point", [("coordinates", ValueNode::constant(vec![lon, lat]))])
}

/// `geometry.bounds()`.
#[must_use]
pub fn bounds(geometry: ValueNode) -> ValueNode {
    invoke("Geometry.bounds", [("geometry", geometry)])
}

/// `image.clipToBoundsAndScale(geometry, scale)`.
#[must_use]
pub fn clip_to_bounds_and_scale(image: ValueNode, geometry: ValueNode, scale: u32) -> ValueNode {
    invoke(
        "Image.clipToBoundsAndScale",
        [("input", image), ("geometry", geometry), ("scale", ValueNode::constant(scale))],
    )
}
