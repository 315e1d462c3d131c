//! Indented drill-down report of a node's diagnostics

use super::DiagnosticNode;
use std::fmt::Write;

const INDENT: &str = "  ";

/// Render `node` and every node its diagnostics cite, depth first.
///
/// ```text
/// message ADT A01: well-formed
///   warning[P014]: Error(s) encountered while parsing segment 2 (EVN).
///     segment 2 (EVN): well-formed
///       warning[P014]: Error(s) encountered while parsing constituent EVN.3.
///         EVN.3: well-formed
///           warning[P008]: Required field EVN.3 is missing.
/// ```
pub fn render(node: &dyn DiagnosticNode) -> String {
    let mut out = String::new();
    render_into(&mut out, node, 0);
    out
}

fn render_into(out: &mut String, node: &dyn DiagnosticNode, depth: usize) {
    let status = node.status();
    let _ = writeln!(
        out,
        "{}{}: {}",
        INDENT.repeat(depth),
        node.label(),
        status.outcome()
    );

    let fatal = status.fatal().len();
    for (i, diagnostic) in status.diagnostics().iter().enumerate() {
        let severity = if i < fatal { "error" } else { "warning" };
        let _ = writeln!(
            out,
            "{}{}[{}]: {}",
            INDENT.repeat(depth + 1),
            severity,
            diagnostic.code,
            diagnostic.message
        );
        for citation in &diagnostic.citations {
            if let Some(child) = node.cited(*citation) {
                render_into(out, child, depth + 2);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{Citation, NodeStatus, ParsingError};
    use crate::logging::codes;

    struct Node {
        name: &'static str,
        status: NodeStatus,
        children: Vec<Node>,
    }

    impl DiagnosticNode for Node {
        fn label(&self) -> String {
            self.name.to_string()
        }

        fn status(&self) -> &NodeStatus {
            &self.status
        }

        fn cited(&self, citation: Citation) -> Option<&dyn DiagnosticNode> {
            match citation {
                Citation::Field(i) => self.children.get(i).map(|c| c as &dyn DiagnosticNode),
                _ => None,
            }
        }
    }

    #[test]
    fn test_render_follows_citations() {
        let mut leaf = NodeStatus::default();
        leaf.push(ParsingError::new(codes::parsing::REQUIRED_FIELD_MISSING, "Required field EVN.3 is missing."));
        leaf.succeed();

        let mut parent = NodeStatus::default();
        parent.fail(ParsingError::citing(codes::parsing::CHILD_MALFORMED, "bad", Citation::Field(0)));
        parent.push(ParsingError::citing(codes::parsing::CHILD_DIAGNOSTICS, "dangling", Citation::Field(7)));

        let tree = Node {
            name: "EVN",
            status: parent,
            children: vec![Node {
                name: "EVN.3",
                status: leaf,
                children: Vec::new(),
            }],
        };

        let text = render(&tree);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            [
                "EVN: malformed",
                "  error[P013]: bad",
                "    EVN.3: well-formed",
                "      warning[P008]: Required field EVN.3 is missing.",
                "  warning[P014]: dangling",
            ]
        );
    }
}
