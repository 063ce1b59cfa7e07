use tree_sitter::{Node, Parser, Tree, TreeCursor};

use crate::filter::{tokenize_comment_or_string, FilterEngine};
use crate::language::{node_text, node_text_range, BackendError, BackendResult, LanguageBackend};
use crate::record::{ContextTag, ExtColumns, ParseResultBuffer};

pub struct RustBackend;

pub static BACKEND: RustBackend = RustBackend;

const KEYWORDS: &[&str] = &[
    "as", "break", "const", "continue", "crate", "else", "enum", "extern", "false", "fn",
    "for", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub", "ref",
    "return", "self", "static", "struct", "super", "trait", "true", "type", "unsafe", "use",
    "where", "while", "async", "await", "dyn",
];

impl LanguageBackend for RustBackend {
    fn id(&self) -> &'static str {
        "rust"
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["rs"]
    }

    fn keywords(&self) -> &'static [&'static str] {
        KEYWORDS
    }

    fn parse(&self, source: &[u8]) -> BackendResult<Tree> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_rust::LANGUAGE.into())
            .map_err(|e| BackendError(e.to_string()))?;
        parser
            .parse(source, None)
            .ok_or_else(|| BackendError("rust grammar returned no tree".to_string()))
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

fn field_name<'a>(node: &Node, source: &'a str) -> Option<&'a str> {
    node.child_by_field_name("name")
        .map(|n| node_text(&n, source))
}

fn has_self_param(node: Node) -> bool {
    if let Some(params) = node.child_by_field_name("parameters") {
        let mut cursor = params.walk();
        for child in params.children(&mut cursor) {
            if child.kind() == "self_parameter" {
                return true;
            }
        }
    }
    false
}

fn visit_node(ctx: &mut VisitCtx, cursor: &mut TreeCursor) {
    let node = cursor.node();

    match node.kind() {
        "function_item" => {
            visit_function(ctx, node);
            return;
        }
        "closure_expression" => {
            visit_closure(ctx, node);
            return;
        }
        "struct_item" | "enum_item" | "union_item" => {
            visit_type_def(ctx, node);
        }
        "trait_item" => {
            visit_trait(ctx, node);
        }
        "mod_item" => {
            visit_mod(ctx, node);
        }
        "impl_item" => {
            visit_impl(ctx, node);
            return;
        }
        "let_declaration" => {
            visit_let(ctx, node);
        }
        "call_expression" => {
            visit_call(ctx, node);
        }
        "use_declaration" => {
            visit_use(ctx, node);
        }
        "line_comment" | "block_comment" => {
            let text = node_text(&node, ctx.source);
            ctx.emit_words(text, ctx.line_of(&node), ContextTag::Comment);
        }
        "string_literal" | "raw_string_literal" => {
            let text = node_text(&node, ctx.source);
            ctx.emit_words(text, ctx.line_of(&node), ContextTag::String);
        }
        "enum_variant" => {
            if let Some(name) = field_name(&node, ctx.source) {
                let line = ctx.line_of(&node);
                let parent = ctx.parent();
                ctx.emit(
                    name,
                    line,
                    ContextTag::EnumCase,
                    true,
                    Some(node_text_range(&node)),
                    ExtColumns {
                        parent_symbol: parent,
                        ..Default::default()
                    },
                );
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
    let Some(name) = field_name(&node, ctx.source) else {
        return;
    };
    let line = ctx.line_of(&node);
    let parent = ctx.parent();
    let scope = if has_self_param(node) {
        "instance"
    } else {
        "static"
    };
    let modifier = visibility_modifier(&node, ctx.source);

    ctx.emit(
        name,
        line,
        ContextTag::Function,
        true,
        Some(node_text_range(&node)),
        ExtColumns {
            parent_symbol: parent.clone(),
            scope: Some(scope.to_string()),
            modifier,
            ..Default::default()
        },
    );

    ctx.parent_stack.push(name.to_string());

    if let Some(params) = node.child_by_field_name("parameters") {
        visit_parameters(ctx, params, name);
    }
    if let Some(body) = node.child_by_field_name("body") {
        let mut cursor = body.walk();
        visit_node(ctx, &mut cursor);
    }

    ctx.parent_stack.pop();
}

fn visibility_modifier(node: &Node, source: &str) -> Option<String> {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "visibility_modifier" {
            return Some(node_text(&child, source).to_string());
        }
    }
    None
}

fn visit_parameters(ctx: &mut VisitCtx, params: Node, parent: &str) {
    let mut cursor = params.walk();
    for child in params.children(&mut cursor) {
        if child.kind() != "parameter" {
            continue;
        }
        if let Some(pattern) = child.child_by_field_name("pattern") {
            if pattern.kind() == "identifier" {
                let name = node_text(&pattern, ctx.source);
                let line = ctx.line_of(&pattern);
                ctx.emit(
                    name,
                    line,
                    ContextTag::Argument,
                    false,
                    None,
                    ExtColumns {
                        parent_symbol: Some(parent.to_string()),
                        ..Default::default()
                    },
                );
            }
        }
    }
}

fn visit_closure(ctx: &mut VisitCtx, node: Node) {
    let line = ctx.line_of(&node);
    ctx.emit(
        "<lambda>",
        line,
        ContextTag::Lambda,
        true,
        Some(node_text_range(&node)),
        ExtColumns {
            parent_symbol: ctx.parent(),
            ..Default::default()
        },
    );

    ctx.parent_stack.push("<lambda>".to_string());
    if let Some(params) = node.child_by_field_name("parameters") {
        visit_parameters(ctx, params, "<lambda>");
    }
    if let Some(body) = node.child_by_field_name("body") {
        let mut cursor = body.walk();
        visit_node(ctx, &mut cursor);
    }
    ctx.parent_stack.pop();
}

fn visit_type_def(ctx: &mut VisitCtx, node: Node) {
    let Some(name) = field_name(&node, ctx.source) else {
        return;
    };
    let line = ctx.line_of(&node);
    ctx.emit(
        name,
        line,
        ContextTag::Class,
        true,
        Some(node_text_range(&node)),
        ExtColumns {
            parent_symbol: ctx.parent(),
            ..Default::default()
        },
    );

    if node.kind() == "struct_item" {
        if let Some(fields) = node.child_by_field_name("body") {
            visit_struct_fields(ctx, fields, name);
        }
    }
}

fn visit_struct_fields(ctx: &mut VisitCtx, body: Node, parent: &str) {
    let mut cursor = body.walk();
    for child in body.children(&mut cursor) {
        if child.kind() != "field_declaration" {
            continue;
        }
        if let Some(name_node) = child.child_by_field_name("name") {
            let name = node_text(&name_node, ctx.source);
            let line = ctx.line_of(&name_node);
            let type_text = child
                .child_by_field_name("type")
                .map(|t| node_text(&t, ctx.source).to_string());
            ctx.emit(
                name,
                line,
                ContextTag::Property,
                false,
                None,
                ExtColumns {
                    parent_symbol: Some(parent.to_string()),
                    type_: type_text,
                    ..Default::default()
                },
            );
        }
    }
}

fn visit_trait(ctx: &mut VisitCtx, node: Node) {
    if let Some(name) = field_name(&node, ctx.source) {
        let line = ctx.line_of(&node);
        ctx.emit(
            name,
            line,
            ContextTag::Trait,
            true,
            Some(node_text_range(&node)),
            ExtColumns {
                parent_symbol: ctx.parent(),
                ..Default::default()
            },
        );
    }
}

fn visit_mod(ctx: &mut VisitCtx, node: Node) {
    if let Some(name) = field_name(&node, ctx.source) {
        let line = ctx.line_of(&node);
        ctx.emit(
            name,
            line,
            ContextTag::Namespace,
            true,
            Some(node_text_range(&node)),
            ExtColumns {
                parent_symbol: ctx.parent(),
                ..Default::default()
            },
        );
    }
}

/// `impl` blocks are not themselves occurrences; they push the
/// implementing type's name as the parent for nested functions so
/// methods record the right `parent_symbol`, matching how `rust.rs` in
/// the donor distinguishes `Method` from `Function` — this crate has
/// no `method` context tag, so the distinction survives only as the
/// `parent_symbol`/`scope` ext-columns on a `function` record.
fn visit_impl(ctx: &mut VisitCtx, node: Node) {
    let type_name = node
        .child_by_field_name("type")
        .map(|t| type_name_text(&t, ctx.source));

    if let Some(name) = type_name {
        ctx.parent_stack.push(name);
    }

    if let Some(body) = node.child_by_field_name("body") {
        let mut cursor = body.walk();
        visit_node(ctx, &mut cursor);
    }

    if type_name_present(&node, ctx.source) {
        ctx.parent_stack.pop();
    }
}

fn type_name_present(node: &Node, source: &str) -> bool {
    node.child_by_field_name("type")
        .map(|t| !type_name_text(&t, source).is_empty())
        .unwrap_or(false)
}

fn type_name_text(node: &Node, source: &str) -> String {
    match node.kind() {
        "type_identifier" => node_text(node, source).to_string(),
        "generic_type" => node
            .child_by_field_name("type")
            .map(|t| type_name_text(&t, source))
            .unwrap_or_default(),
        "scoped_type_identifier" => node
            .child_by_field_name("name")
            .map(|n| node_text(&n, source).to_string())
            .unwrap_or_default(),
        _ => node_text(node, source).to_string(),
    }
}

fn visit_let(ctx: &mut VisitCtx, node: Node) {
    let Some(pattern) = node.child_by_field_name("pattern") else {
        return;
    };
    if pattern.kind() != "identifier" {
        return;
    }
    let name = node_text(&pattern, ctx.source);
    let line = ctx.line_of(&pattern);
    let type_text = node
        .child_by_field_name("type")
        .map(|t| node_text(&t, ctx.source).to_string());
    ctx.emit(
        name,
        line,
        ContextTag::Variable,
        false,
        None,
        ExtColumns {
            parent_symbol: ctx.parent(),
            type_: type_text,
            ..Default::default()
        },
    );
}

fn visit_call(ctx: &mut VisitCtx, node: Node) {
    let Some(function) = node.child_by_field_name("function") else {
        return;
    };

    let (name, receiver) = match function.kind() {
        "identifier" => (node_text(&function, ctx.source).to_string(), None),
        "field_expression" => {
            let field = function.child_by_field_name("field");
            let value = function.child_by_field_name("value");
            (
                field.map(|f| node_text(&f, ctx.source).to_string()).unwrap_or_default(),
                value.map(|v| node_text(&v, ctx.source).to_string()),
            )
        }
        "scoped_identifier" => (node_text(&function, ctx.source).to_string(), None),
        _ => return,
    };

    let line = ctx.line_of(&node);
    ctx.emit(
        &name,
        line,
        ContextTag::Call,
        false,
        None,
        ExtColumns {
            parent_symbol: receiver,
            ..Default::default()
        },
    );
}

fn visit_use(ctx: &mut VisitCtx, node: Node) {
    let text = node_text(&node, ctx.source);
    let line = ctx.line_of(&node);
    let last_segment = text
        .trim_start_matches("use ")
        .trim_end_matches(';')
        .rsplit("::")
        .next()
        .unwrap_or(text)
        .trim();
    ctx.emit(
        last_segment,
        line,
        ContextTag::Import,
        false,
        None,
        ExtColumns::default(),
    );
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
        BACKEND.visit(source, &tree, "d", "f.rs", &permissive_filter(), &mut buf);
        buf
    }

    #[test]
    fn extracts_function_definition_and_arguments() {
        let buf = run("fn add(left: i32, right: i32) -> i32 { left + right }");
        let records: Vec<_> = buf.iter().collect();
        let function = records
            .iter()
            .find(|r| r.context == ContextTag::Function && r.symbol == "add")
            .expect("function record");
        assert!(function.is_definition);
        assert!(records.iter().any(|r| r.context == ContextTag::Argument && r.symbol == "left"));
        assert!(records.iter().any(|r| r.context == ContextTag::Argument && r.symbol == "right"));
    }

    #[test]
    fn methods_record_parent_and_instance_scope() {
        let buf = run("struct Foo; impl Foo { fn bar(&self) {} }");
        let records: Vec<_> = buf.iter().collect();
        let method = records
            .iter()
            .find(|r| r.symbol == "bar")
            .expect("method record");
        assert_eq!(method.ext.parent_symbol.as_deref(), Some("Foo"));
        assert_eq!(method.ext.scope.as_deref(), Some("instance"));
    }

    #[test]
    fn closures_use_lambda_literal_and_attach_params_to_lambda() {
        let buf = run("fn make() { let f = |x: i32| x + 1; }");
        let records: Vec<_> = buf.iter().collect();
        let lambda = records
            .iter()
            .find(|r| r.context == ContextTag::Lambda)
            .expect("lambda record");
        assert_eq!(lambda.symbol, "<lambda>");
        assert!(lambda.is_definition);
        assert!(records
            .iter()
            .any(|r| r.context == ContextTag::Argument && r.ext.parent_symbol.as_deref() == Some("<lambda>")));
    }

    #[test]
    fn comment_words_are_tokenized() {
        let buf = run("// see helper for details\nfn helper() {}");
        let records: Vec<_> = buf.iter().collect();
        assert!(records.iter().any(|r| r.context == ContextTag::Comment && r.symbol == "see"));
    }
}
