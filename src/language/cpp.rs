use tree_sitter::{Node, Parser, Tree, TreeCursor};
use tree_sitter_cpp::LANGUAGE;

use crate::filter::{tokenize_comment_or_string, FilterEngine};
use crate::language::{node_text, node_text_range, BackendError, BackendResult, LanguageBackend};
use crate::record::{ContextTag, ExtColumns, ParseResultBuffer};

pub struct CppBackend;

pub static BACKEND: CppBackend = CppBackend;

const KEYWORDS: &[&str] = &[
    "if", "else", "for", "while", "do", "switch", "case", "break", "continue", "return",
    "class", "struct", "namespace", "public", "private", "protected", "virtual", "static",
    "const", "void", "int", "char", "float", "double", "bool", "auto", "new", "delete",
    "template", "typename", "using", "enum", "goto",
];

impl LanguageBackend for CppBackend {
    fn id(&self) -> &'static str {
        "cpp"
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["cpp", "cc", "cxx", "hpp", "hh", "h", "c"]
    }

    fn keywords(&self) -> &'static [&'static str] {
        KEYWORDS
    }

    fn parse(&self, source: &[u8]) -> BackendResult<Tree> {
        let mut parser = Parser::new();
        parser
            .set_language(&LANGUAGE.into())
            .map_err(|e| BackendError(e.to_string()))?;
        parser
            .parse(source, None)
            .ok_or_else(|| BackendError("cpp grammar returned no tree".to_string()))
    }

    fn visit(
        &self,
        source: &str,
        tree: &Tree,
        directory: &str,
        filename: &str,
        filter: &FilterEngine,
        buf: &mut ParseResultBuffer,
    ) {
        let mut ctx = VisitCtx {
            source,
            directory,
            filename,
            filter,
            buf,
            parent_stack: Vec::new(),
        };
        let mut cursor = tree.root_node().walk();
        visit_node(&mut ctx, &mut cursor);
    }
}

struct VisitCtx<'a> {
    source: &'a str,
    directory: &'a str,
    filename: &'a str,
    filter: &'a FilterEngine,
    buf: &'a mut ParseResultBuffer,
    parent_stack: Vec<String>,
}

impl<'a> VisitCtx<'a> {
    fn parent(&self) -> Option<String> {
        self.parent_stack.last().cloned()
    }

    fn line_of(&self, node: &Node) -> u32 {
        node.start_position().row as u32 + 1
    }

    fn emit(
        &mut self,
        raw_symbol: &str,
        line: u32,
        context: ContextTag,
        is_definition: bool,
        source_location: Option<crate::record::SourceLocation>,
        ext: ExtColumns,
    ) {
        if !self.filter.should_index(raw_symbol) {
            return;
        }
        self.buf.add_entry(
            raw_symbol,
            line,
            context,
            self.directory,
            self.filename,
            source_location,
            is_definition,
            ext,
        );
    }

    fn emit_words(&mut self, text: &str, line: u32, context: ContextTag) {
        for word in tokenize_comment_or_string(text) {
            if !self.filter.should_index(&word) {
                continue;
            }
            self.buf.add_entry(
                &word,
                line,
                context,
                self.directory,
                self.filename,
                None,
                false,
                ExtColumns::default(),
            );
        }
    }
}

/// Find an identifier-shaped name by recursing through declarator
/// wrappers, matching spec.md §4.4's "extract a small, well-defined set
/// of child identifiers" guidance for C-style declarators.
fn find_name<'a>(node: Node, source: &'a str) -> Option<&'a str> {
    if let Some(name) = node.child_by_field_name("name") {
        return Some(node_text(&name, source));
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "identifier" | "field_identifier" | "type_identifier" | "namespace_identifier" => {
                return Some(node_text(&child, source));
            }
            "function_declarator" | "pointer_declarator" | "reference_declarator"
            | "qualified_identifier" => {
                if let Some(name) = find_name(child, source) {
                    return Some(name);
                }
            }
            _ => {}
        }
    }
    None
}

fn is_function_declarator(node: &Node) -> bool {
    let mut cursor = node.walk();
    node.children(&mut cursor).any(|c| c.kind() == "function_declarator")
}

fn visit_node(ctx: &mut VisitCtx, cursor: &mut TreeCursor) {
    let node = cursor.node();

    match node.kind() {
        "function_definition" => {
            visit_function(ctx, node);
            return;
        }
        "class_specifier" | "struct_specifier" => {
            visit_class(ctx, node);
        }
        "namespace_definition" => {
            visit_namespace(ctx, node);
        }
        "field_declaration" if is_function_declarator(&node) => {
            visit_method_decl(ctx, node);
        }
        "declaration" => {
            visit_variable_decl(ctx, node);
        }
        "call_expression" => {
            visit_call(ctx, node);
        }
        "preproc_include" => {
            visit_include(ctx, node);
        }
        "comment" => {
            let text = node_text(&node, ctx.source);
            ctx.emit_words(text, ctx.line_of(&node), ContextTag::Comment);
        }
        "string_literal" => {
            let text = node_text(&node, ctx.source);
            ctx.emit_words(text, ctx.line_of(&node), ContextTag::String);
        }
        "enumerator" => {
            if let Some(name) = node.child_by_field_name("name") {
                let text = node_text(&name, ctx.source);
                let line = ctx.line_of(&name);
                let parent = ctx.parent();
                ctx.emit(
                    text,
                    line,
                    ContextTag::EnumCase,
                    true,
                    None,
                    ExtColumns { parent_symbol: parent, ..Default::default() },
                );
            }
        }
        "enum_specifier" => {
            if let Some(name) = node.child_by_field_name("name") {
                let text = node_text(&name, ctx.source);
                let line = ctx.line_of(&name);
                ctx.emit(
                    text,
                    line,
                    ContextTag::Enum,
                    true,
                    Some(node_text_range(&node)),
                    ExtColumns { parent_symbol: ctx.parent(), ..Default::default() },
                );
            }
        }
        "goto_statement" => {
            if let Some(label) = node.child_by_field_name("label") {
                let text = node_text(&label, ctx.source);
                ctx.emit(text, ctx.line_of(&node), ContextTag::Goto, false, None, ExtColumns::default());
            }
        }
        "labeled_statement" => {
            if let Some(label) = node.child_by_field_name("label") {
                let text = node_text(&label, ctx.source);
                ctx.emit(text, ctx.line_of(&node), ContextTag::Label, true, None, ExtColumns::default());
            }
        }
        _ => {}
    }

    if cursor.goto_first_child() {
        loop {
            visit_node(ctx, cursor);
            if !cursor.goto_next_sibling() {
                break;
            }
        }
        cursor.goto_parent();
    }
}

fn visit_function(ctx: &mut VisitCtx, node: Node) {
    let Some(declarator) = node.child_by_field_name("declarator") else {
        return;
    };
    let Some(name) = find_name(declarator, ctx.source) else {
        return;
    };
    let name = name.to_string();
    let line = ctx.line_of(&node);
    let is_method = is_inside_class(node);

    ctx.emit(
        &name,
        line,
        ContextTag::Function,
        true,
        Some(node_text_range(&node)),
        ExtColumns {
            parent_symbol: ctx.parent(),
            scope: Some(if is_method { "instance".to_string() } else { "static".to_string() }),
            ..Default::default()
        },
    );

    ctx.parent_stack.push(name.clone());
    visit_parameters(ctx, declarator, &name);
    if let Some(body) = node.child_by_field_name("body") {
        let mut cursor = body.walk();
        visit_node(ctx, &mut cursor);
    }
    ctx.parent_stack.pop();
}

fn is_inside_class(node: Node) -> bool {
    let mut parent = node.parent();
    while let Some(p) = parent {
        match p.kind() {
            "class_specifier" | "struct_specifier" => return true,
            "translation_unit" => return false,
            _ => parent = p.parent(),
        }
    }
    false
}

fn visit_method_decl(ctx: &mut VisitCtx, node: Node) {
    let Some(declarator) = node.child_by_field_name("declarator") else {
        return;
    };
    let Some(name) = find_name(declarator, ctx.source) else {
        return;
    };
    let line = ctx.line_of(&node);
    ctx.emit(
        name,
        line,
        ContextTag::Function,
        true,
        Some(node_text_range(&node)),
        ExtColumns {
            parent_symbol: ctx.parent(),
            scope: Some("instance".to_string()),
            ..Default::default()
        },
    );
}

fn visit_parameters(ctx: &mut VisitCtx, declarator: Node, parent: &str) {
    let Some(params) = declarator.child_by_field_name("parameters") else {
        return;
    };
    let mut cursor = params.walk();
    for child in params.children(&mut cursor) {
        if child.kind() != "parameter_declaration" {
            continue;
        }
        if let Some(decl) = child.child_by_field_name("declarator") {
            if let Some(name) = find_name(decl, ctx.source) {
                let line = ctx.line_of(&decl);
                ctx.emit(
                    name,
                    line,
                    ContextTag::Argument,
                    false,
                    None,
                    ExtColumns { parent_symbol: Some(parent.to_string()), ..Default::default() },
                );
            }
        }
    }
}

fn visit_class(ctx: &mut VisitCtx, node: Node) {
    let Some(name_node) = node.child_by_field_name("name") else {
        return;
    };
    let name = node_text(&name_node, ctx.source).to_string();
    let line = ctx.line_of(&node);
    ctx.emit(
        &name,
        line,
        ContextTag::Class,
        true,
        Some(node_text_range(&node)),
        ExtColumns { parent_symbol: ctx.parent(), ..Default::default() },
    );
}

fn visit_namespace(ctx: &mut VisitCtx, node: Node) {
    if let Some(name_node) = node.child_by_field_name("name") {
        let name = node_text(&name_node, ctx.source);
        let line = ctx.line_of(&node);
        ctx.emit(
            name,
            line,
            ContextTag::Namespace,
            true,
            Some(node_text_range(&node)),
            ExtColumns { parent_symbol: ctx.parent(), ..Default::default() },
        );
    }
}

fn visit_variable_decl(ctx: &mut VisitCtx, node: Node) {
    let Some(type_node) = node.child_by_field_name("type") else {
        return;
    };
    let type_text = node_text(&type_node, ctx.source).to_string();

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "init_declarator" || child.kind() == "identifier" {
            let declarator = if child.kind() == "init_declarator" {
                child.child_by_field_name("declarator").unwrap_or(child)
            } else {
                child
            };
            if is_function_declarator(&declarator) {
                continue;
            }
            if let Some(name) = find_name(declarator, ctx.source) {
                let line = ctx.line_of(&child);
                ctx.emit(
                    name,
                    line,
                    ContextTag::Variable,
                    false,
                    None,
                    ExtColumns {
                        parent_symbol: ctx.parent(),
                        type_: Some(type_text.clone()),
                        ..Default::default()
                    },
                );
            }
        }
    }
}

fn visit_call(ctx: &mut VisitCtx, node: Node) {
    let Some(function) = node.child_by_field_name("function") else {
        return;
    };
    let (name, receiver) = match function.kind() {
        "identifier" => (node_text(&function, ctx.source).to_string(), None),
        "field_expression" => {
            let field = function.child_by_field_name("field");
            let arg = function.child_by_field_name("argument");
            (
                field.map(|f| node_text(&f, ctx.source).to_string()).unwrap_or_default(),
                arg.map(|a| node_text(&a, ctx.source).to_string()),
            )
        }
        _ => return,
    };
    let line = ctx.line_of(&node);
    ctx.emit(
        &name,
        line,
        ContextTag::Call,
        false,
        None,
        ExtColumns { parent_symbol: receiver, ..Default::default() },
    );
}

fn visit_include(ctx: &mut VisitCtx, node: Node) {
    let text = node_text(&node, ctx.source);
    let name = text
        .trim_start_matches("#include")
        .trim()
        .trim_matches(|c| c == '<' || c == '>' || c == '"');
    ctx.emit(name, ctx.line_of(&node), ContextTag::Import, false, None, ExtColumns::default());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterEngine;
    use std::collections::HashSet;

    fn permissive_filter() -> FilterEngine {
        FilterEngine::new(HashSet::new(), HashSet::new())
    }

    fn run(source: &str) -> ParseResultBuffer {
        let tree = BACKEND.parse(source.as_bytes()).expect("parse");
        let mut buf = ParseResultBuffer::new();
        BACKEND.visit(source, &tree, "d", "foo.c", &permissive_filter(), &mut buf);
        buf
    }

    #[test]
    fn scenario_one_from_spec_extracts_main_and_its_arguments() {
        let buf = run("int main(int argc, char **argv){ return 0; }");
        let records: Vec<_> = buf.iter().collect();

        let main_fn = records
            .iter()
            .find(|r| r.context == ContextTag::Function && r.symbol == "main")
            .expect("main function record");
        assert!(main_fn.is_definition);
        assert_eq!(main_fn.line, 1);

        assert!(records.iter().any(|r| r.context == ContextTag::Argument
            && r.symbol == "argc"
            && r.ext.parent_symbol.as_deref() == Some("main")));
        assert!(records.iter().any(|r| r.context == ContextTag::Argument
            && r.symbol == "argv"
            && r.ext.parent_symbol.as_deref() == Some("main")));

        // "return" is a language keyword and must not survive filtering.
        assert!(!records.iter().any(|r| r.symbol == "return"));
    }

    #[test]
    fn reindexing_with_appended_function_keeps_earlier_records() {
        let buf = run("int main(int argc, char **argv){ return 0; }\n\nint helper(){return 1;}");
        let records: Vec<_> = buf.iter().collect();
        assert!(records.iter().any(|r| r.symbol == "main"));
        let helper = records.iter().find(|r| r.symbol == "helper").expect("helper record");
        assert_eq!(helper.line, 3);
    }
}
