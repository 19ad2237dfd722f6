//! Object model: type identities, stored objects and create trees

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::value::Fields;

/// A durable type identity. One per distinct type name, ever.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectType {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// An object as read back from storage
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamicObject {
    pub id: i64,
    #[serde(rename = "type")]
    pub object_type: ObjectType,
    pub fields: Fields,
    pub created_at: DateTime<Utc>,
    pub modified_at: Option<DateTime<Utc>>,
    pub deleted: bool,
    /// Top-level master this object was created under; `None` for masters
    pub master_object_id: Option<i64>,
}

impl DynamicObject {
    pub fn is_master(&self) -> bool {
        self.master_object_id.is_none()
    }
}

/// One node of a create tree: a type, its raw fields and its sub-objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectNode {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
    #[serde(default, rename = "relatedSubObjects")]
    pub children: Vec<ObjectNode>,
}

impl ObjectNode {
    pub fn new(type_name: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            type_name: type_name.into(),
            fields,
            children: Vec::new(),
        }
    }

    /// Build a node from a JSON object literal; non-object values give no fields
    pub fn from_json(type_name: impl Into<String>, fields: Value) -> Self {
        match fields {
            Value::Object(map) => Self::new(type_name, map),
            _ => Self::new(type_name, Map::new()),
        }
    }

    /// Add a sub-object
    pub fn with_child(mut self, child: ObjectNode) -> Self {
        self.children.push(child);
        self
    }

    /// Depth-first pre-order walk with an explicit stack.
    ///
    /// Yields `(depth, node)`; the root is depth 0.
    pub fn walk(&self) -> Vec<(usize, &ObjectNode)> {
        let mut order = Vec::new();
        let mut stack = vec![(0usize, self)];
        while let Some((depth, node)) = stack.pop() {
            order.push((depth, node));
            for child in node.children.iter().rev() {
                stack.push((depth + 1, child));
            }
        }
        order
    }
}

/// Fields of the master object in a create request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterObject {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

/// Create request as accepted over HTTP and from files:
/// `{"masterObject": {...}, "relatedSubObjects": [...]}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequest {
    pub master_object: MasterObject,
    #[serde(default)]
    pub related_sub_objects: Vec<ObjectNode>,
}

impl CreateRequest {
    pub fn into_tree(self) -> ObjectNode {
        ObjectNode {
            type_name: self.master_object.type_name,
            fields: self.master_object.fields,
            children: self.related_sub_objects,
        }
    }
}

/// Update request: the complete replacement field set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateRequest {
    #[serde(default)]
    pub fields: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_walk_is_depth_first_preorder() {
        let tree = ObjectNode::from_json("A", json!({}))
            .with_child(
                ObjectNode::from_json("B", json!({}))
                    .with_child(ObjectNode::from_json("C", json!({}))),
            )
            .with_child(ObjectNode::from_json("D", json!({})));

        let order: Vec<_> = tree
            .walk()
            .into_iter()
            .map(|(depth, n)| (depth, n.type_name.as_str()))
            .collect();
        assert_eq!(order, vec![(0, "A"), (1, "B"), (2, "C"), (1, "D")]);
    }

    #[test]
    fn test_create_request_parses_wire_shape() {
        let body = json!({
            "masterObject": {"type": "Order", "fields": {"CustomerId": 7, "ProductList": [1, 2]}},
            "relatedSubObjects": [
                {
                    "type": "Payment",
                    "fields": {"Amount": 10},
                    "relatedSubObjects": [{"type": "Address", "fields": {"City": "Oslo"}}]
                }
            ]
        });

        let request: CreateRequest = serde_json::from_value(body).unwrap();
        let tree = request.into_tree();
        assert_eq!(tree.type_name, "Order");
        assert_eq!(tree.children.len(), 1);
        assert_eq!(tree.children[0].children[0].type_name, "Address");
        assert_eq!(tree.walk().len(), 3);
    }
}
