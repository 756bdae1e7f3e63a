use crate::attributes::Attributes;
use crate::parsers::{parse_attribute, set_attribute};
use crate::session::Session;

use super::context::PrimitiveContext;
use super::{FilterEffect, Input, Primitive, PrimitiveAttributes};

/// The `feMerge` filter primitive.
///
/// Its inputs come from its `<feMergeNode>` children; later nodes are painted over the
/// earlier ones.
#[derive(Debug, Default, Clone)]
pub struct FeMerge {
    base: Primitive,
    merge_nodes: Vec<FeMergeNode>,
}

/// The `<feMergeNode>` element.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeMergeNode {
    in1: Input,
}

impl FeMergeNode {
    fn set_attributes(&mut self, attrs: &Attributes, session: &Session) {
        for (attr, value) in attrs.iter() {
            if attr == "in" {
                set_attribute(&mut self.in1, parse_attribute(attr, value), session);
            }
        }
    }
}

impl FeMerge {
    pub fn add_node(&mut self, attrs: &Attributes, session: &Session) {
        let mut node = FeMergeNode::default();
        node.set_attributes(attrs, session);
        self.merge_nodes.push(node);
    }
}

impl FilterEffect for FeMerge {
    fn set_attributes(&mut self, attrs: &Attributes, session: &Session) {
        self.base.parse_no_inputs(attrs, session);
    }

    fn primitive(&self) -> &Primitive {
        &self.base
    }

    fn inputs(&self) -> Vec<Input> {
        self.merge_nodes.iter().map(|n| n.in1.clone()).collect()
    }

    fn operates_on_srgb(&self, _input_index: usize, input_is_srgb: bool) -> bool {
        input_is_srgb
    }

    fn build(&self, _ctx: &PrimitiveContext<'_>) -> PrimitiveAttributes {
        PrimitiveAttributes::Merge
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::CustomIdent;

    #[test]
    fn collects_merge_nodes_in_order() {
        let session = Session::new_with_logging(false);
        let mut merge = FeMerge::default();

        for name in ["a", "b", "c"] {
            let attrs: Attributes = [("in", name)].into_iter().collect();
            merge.add_node(&attrs, &session);
        }

        let names: Vec<Input> = ["a", "b", "c"]
            .iter()
            .map(|s| Input::FilterOutput(CustomIdent(s.to_string())))
            .collect();

        assert_eq!(merge.inputs(), names);
    }
}
