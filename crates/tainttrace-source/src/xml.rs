use quick_xml::events::Event;
use quick_xml::Reader;

use tainttrace_core::AnalysisError;
use tainttrace_core::Result;

/// One code element pulled out of a function body: a declaration,
/// parameter, return statement, call, or an expression carrying an
/// assignment/comparison/arithmetic operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeElement {
    pub kind: String,
    pub content: String,
    pub function_name: String,
}

/// A node or text run inside a parsed srcML element, kept in document
/// order so reconstructed text content matches what the original tool
/// produced.
#[derive(Debug, Clone)]
pub(crate) enum NodeChild {
    Element(XmlNode),
    Text(String),
}

#[derive(Debug, Clone)]
pub(crate) struct XmlNode {
    pub(crate) name: String,
    pub(crate) content: Vec<NodeChild>,
}

impl XmlNode {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: Vec::new(),
        }
    }

    pub(crate) fn elements(&self) -> impl Iterator<Item = &XmlNode> {
        self.content.iter().filter_map(|c| match c {
            NodeChild::Element(e) => Some(e),
            NodeChild::Text(_) => None,
        })
    }

    pub(crate) fn find_child(&self, name: &str) -> Option<&XmlNode> {
        self.elements().find(|e| e.name == name)
    }

    fn remove_child(&mut self, name: &str) {
        if let Some(pos) = self.content.iter().position(
            |c| matches!(c, NodeChild::Element(e) if e.name == name),
        ) {
            self.content.remove(pos);
        }
    }

    pub(crate) fn text_content(&self) -> String {
        let mut out = String::new();
        for child in &self.content {
            match child {
                NodeChild::Text(t) => out.push_str(t),
                NodeChild::Element(e) => out.push_str(&e.text_content()),
            }
        }
        out
    }
}

pub(crate) fn parse_tree(xml: &str) -> Result<XmlNode> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(false);

    let mut root = XmlNode::new("#document");
    let mut stack: Vec<XmlNode> = vec![];
    let mut buf = Vec::new();

    loop {
        match reader
            .read_event_into(&mut buf)
            .map_err(|e| AnalysisError::xml_error(e.to_string()))?
        {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                stack.push(XmlNode::new(name));
            }
            Event::Empty(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                let node = XmlNode::new(name);
                push_child(&mut stack, &mut root, NodeChild::Element(node));
            }
            Event::End(_) => {
                if let Some(node) = stack.pop() {
                    push_child(&mut stack, &mut root, NodeChild::Element(node));
                }
            }
            Event::Text(t) | Event::CData(t) => {
                let text = t
                    .unescape()
                    .map(|c| c.into_owned())
                    .unwrap_or_else(|_| String::from_utf8_lossy(&t).into_owned());
                if !text.is_empty() {
                    push_child(&mut stack, &mut root, NodeChild::Text(text));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(root)
}

fn push_child(stack: &mut Vec<XmlNode>, root: &mut XmlNode, child: NodeChild) {
    if let Some(parent) = stack.last_mut() {
        parent.content.push(child);
    } else {
        root.content.push(child);
    }
}

const IGNORED_ELEMENTS: &[&str] = &["comment", "function_decl", "type"];

fn is_ignored_element(node: &XmlNode) -> bool {
    IGNORED_ELEMENTS.contains(&node.name.as_str())
}

fn is_valid_expression(kind: &str, content: &str) -> bool {
    match kind {
        "decl" | "parameter" | "return" | "call" => true,
        "expr" => ["=", "==", "<", ">", "+", "-", "*", "/"]
            .iter()
            .any(|op| content.contains(op)),
        _ => false,
    }
}

/// Walks the parsed srcML document, recursively collecting every
/// [`CodeElement`] of interest, tagging each with the name of the enclosing
/// `<function>` element (or the enclosing function's name passed in, for a
/// fragment that starts mid-body).
pub fn parse_elements(xml: &str, enclosing_function: &str) -> Result<Vec<CodeElement>> {
    let document = parse_tree(xml)?;
    let mut elements = Vec::new();
    for top in document.elements() {
        walk(top, enclosing_function, &mut elements);
    }
    Ok(elements)
}

fn walk(node: &XmlNode, current_function: &str, elements: &mut Vec<CodeElement>) {
    let mut function_context = current_function.to_string();
    if node.name == "function" {
        if let Some(name_node) = node.find_child("name") {
            let name = name_node.text_content();
            if !name.trim().is_empty() {
                function_context = name.trim().to_string();
            }
        }
    }

    for child in node.elements() {
        if is_ignored_element(child) {
            continue;
        }
        walk(child, &function_context, elements);
    }

    let content = node.text_content();
    if is_valid_expression(&node.name, &content) {
        let mut rendered = node.clone();
        rendered.remove_child("type");
        let final_content = rendered.text_content();
        elements.push(CodeElement {
            kind: node.name.clone(),
            content: final_content,
            function_name: function_context,
        });
    }
}
