//! Syntax-tree based source transformer.
//!
//! Parses the source as TSX with oxc and removes import/export/type nodes by
//! span, so string contents and nested generics are never touched. Sources
//! that do not parse are handed to [`LexicalTransformer`] instead.
//!
//! Not handled: enums, namespaces, decorators and constructor parameter
//! properties. They reach the runtime unchanged and fail there.

use oxc_allocator::{Allocator, Vec as ArenaVec};
use oxc_ast::ast::{
    Declaration, Decorator, ExportDefaultDeclarationKind, MethodDefinition, PropertyDefinition,
    Statement, TSAsExpression, TSClassImplements, TSInterfaceDeclaration, TSNonNullExpression,
    TSSatisfiesExpression, TSTypeAliasDeclaration, TSTypeAnnotation, TSTypeParameterDeclaration,
    TSTypeParameterInstantiation,
};
use oxc_ast_visit::{walk, Visit};
use oxc_parser::Parser;
use oxc_span::{GetSpan, SourceType, Span};

use crate::lexical::LexicalTransformer;
use crate::traits::SourceTransformer;

/// Transformer that strips module and type syntax from a parsed tree.
#[derive(Debug, Default, Clone, Copy)]
pub struct SyntaxTransformer {
    fallback: LexicalTransformer,
}

impl SyntaxTransformer {
    /// Create a new syntax transformer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Strip the source, or `None` when it does not parse cleanly.
    pub fn try_transform(&self, source: &str) -> Option<String> {
        let allocator = Allocator::default();
        let ret = Parser::new(&allocator, source, SourceType::tsx()).parse();

        if ret.panicked || !ret.errors.is_empty() {
            return None;
        }

        let mut collector = CutCollector::new(source);

        for stmt in &ret.program.body {
            collector.module_syntax(stmt);
        }
        collector.visit_program(&ret.program);

        Some(apply_cuts(source, collector.cuts).trim().to_string())
    }
}

impl SourceTransformer for SyntaxTransformer {
    fn name(&self) -> &'static str {
        "syntax"
    }

    fn transform(&self, source: &str) -> String {
        self.try_transform(source).unwrap_or_else(|| {
            tracing::debug!("Source did not parse, falling back to lexical transform");
            self.fallback.transform(source)
        })
    }
}

/// A byte range to delete from the source.
#[derive(Debug, Clone, Copy)]
struct Cut {
    start: u32,
    end: u32,
    /// Type annotations also take their `:` and optional `?` marker
    annotation: bool,
}

impl Cut {
    fn node(span: Span) -> Self {
        Self {
            start: span.start,
            end: span.end,
            annotation: false,
        }
    }

    fn between(start: u32, end: u32) -> Self {
        Self {
            start,
            end,
            annotation: false,
        }
    }

    fn annotation(span: Span) -> Self {
        Self {
            start: span.start,
            end: span.end,
            annotation: true,
        }
    }
}

/// Class member modifiers that only exist in TypeScript.
const MEMBER_MODIFIERS: &[&str] = &["public", "private", "protected", "readonly", "override"];

#[derive(Debug)]
struct CutCollector<'s> {
    source: &'s str,
    cuts: Vec<Cut>,
}

impl<'s> CutCollector<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            source,
            cuts: Vec::new(),
        }
    }

    /// Record module-level import/export syntax for a top-level statement.
    fn module_syntax(&mut self, stmt: &Statement<'_>) {
        match stmt {
            Statement::ImportDeclaration(decl) => self.cuts.push(Cut::node(decl.span)),
            Statement::ExportAllDeclaration(decl) => self.cuts.push(Cut::node(decl.span)),
            Statement::TSExportAssignment(decl) => self.cuts.push(Cut::node(decl.span)),
            Statement::ExportNamedDeclaration(decl) => match &decl.declaration {
                Some(declaration) if !is_type_declaration(declaration) => self
                    .cuts
                    .push(Cut::between(decl.span.start, declaration.span().start)),
                // Re-export lists and exported types have no runtime part
                _ => self.cuts.push(Cut::node(decl.span)),
            },
            Statement::ExportDefaultDeclaration(decl) => match &decl.declaration {
                ExportDefaultDeclarationKind::Identifier(_)
                | ExportDefaultDeclarationKind::TSInterfaceDeclaration(_) => {
                    self.cuts.push(Cut::node(decl.span))
                }
                kind => self
                    .cuts
                    .push(Cut::between(decl.span.start, kind.span().start)),
            },
            _ => {}
        }
    }

    fn after_expression(&mut self, expression_end: u32, node_end: u32) {
        self.cuts.push(Cut::between(expression_end, node_end));
    }

    /// Cut modifier words between a member's decorators and its key.
    fn member_modifiers(
        &mut self,
        member_start: u32,
        decorators: &[Decorator<'_>],
        key_start: u32,
    ) {
        let bytes = self.source.as_bytes();
        let end = key_start as usize;
        let mut pos = decorators
            .iter()
            .map(|d| d.span.end)
            .max()
            .unwrap_or(member_start) as usize;

        while pos < end {
            let word_start = skip_whitespace_forward(bytes, pos);
            let word_end = word_start
                + bytes[word_start..end]
                    .iter()
                    .take_while(|b| b.is_ascii_alphabetic())
                    .count();

            // The key itself may be spelled like a modifier
            if word_end == word_start || word_end >= end {
                break;
            }

            let word = &self.source[word_start..word_end];
            if MEMBER_MODIFIERS.contains(&word) {
                let next = skip_whitespace_forward(bytes, word_end);
                self.cuts.push(Cut::between(word_start as u32, next as u32));
            } else if word != "static" {
                break;
            }
            pos = word_end;
        }
    }
}

impl<'a> Visit<'a> for CutCollector<'_> {
    fn visit_ts_type_annotation(&mut self, it: &TSTypeAnnotation<'a>) {
        self.cuts.push(Cut::annotation(it.span));
    }

    fn visit_ts_type_parameter_declaration(&mut self, it: &TSTypeParameterDeclaration<'a>) {
        self.cuts.push(Cut::node(it.span));
    }

    fn visit_ts_type_parameter_instantiation(&mut self, it: &TSTypeParameterInstantiation<'a>) {
        self.cuts.push(Cut::node(it.span));
    }

    fn visit_ts_interface_declaration(&mut self, it: &TSInterfaceDeclaration<'a>) {
        self.cuts.push(Cut::node(it.span));
    }

    fn visit_ts_type_alias_declaration(&mut self, it: &TSTypeAliasDeclaration<'a>) {
        self.cuts.push(Cut::node(it.span));
    }

    fn visit_ts_as_expression(&mut self, it: &TSAsExpression<'a>) {
        self.after_expression(it.expression.span().end, it.span.end);
        self.visit_expression(&it.expression);
    }

    fn visit_ts_satisfies_expression(&mut self, it: &TSSatisfiesExpression<'a>) {
        self.after_expression(it.expression.span().end, it.span.end);
        self.visit_expression(&it.expression);
    }

    fn visit_ts_non_null_expression(&mut self, it: &TSNonNullExpression<'a>) {
        self.after_expression(it.expression.span().end, it.span.end);
        self.visit_expression(&it.expression);
    }

    fn visit_ts_class_implements_list(&mut self, it: &ArenaVec<'a, TSClassImplements<'a>>) {
        let (Some(first), Some(last)) = (it.first(), it.last()) else {
            return;
        };

        let before = self.source[..first.span.start as usize].trim_end();
        if let Some(keyword) = before.strip_suffix("implements") {
            self.cuts
                .push(Cut::between(keyword.trim_end().len() as u32, last.span.end));
        }
    }

    fn visit_property_definition(&mut self, it: &PropertyDefinition<'a>) {
        if it.accessibility.is_some() || it.readonly || it.r#override {
            self.member_modifiers(it.span.start, &it.decorators, it.key.span().start);
        }
        walk::walk_property_definition(self, it);
    }

    fn visit_method_definition(&mut self, it: &MethodDefinition<'a>) {
        if it.accessibility.is_some() || it.r#override {
            self.member_modifiers(it.span.start, &it.decorators, it.key.span().start);
        }
        walk::walk_method_definition(self, it);
    }
}

fn is_type_declaration(declaration: &Declaration<'_>) -> bool {
    matches!(
        declaration,
        Declaration::TSTypeAliasDeclaration(_) | Declaration::TSInterfaceDeclaration(_)
    )
}

/// Delete every cut from the source; overlapping cuts are merged.
fn apply_cuts(source: &str, cuts: Vec<Cut>) -> String {
    let bytes = source.as_bytes();

    let mut ranges: Vec<(usize, usize)> = cuts
        .into_iter()
        .map(|cut| {
            let start = cut.start as usize;
            let start = if cut.annotation {
                widen_annotation(bytes, start)
            } else {
                start
            };
            (start, cut.end as usize)
        })
        .collect();
    ranges.sort_unstable();

    let mut output = String::with_capacity(source.len());
    let mut cursor = 0;

    for (start, end) in ranges {
        if end <= cursor {
            continue;
        }
        let start = start.max(cursor);
        output.push_str(&source[cursor..start]);
        cursor = end;
    }
    output.push_str(&source[cursor..]);

    output
}

/// Move an annotation start back over its `:` and an optional `?` marker.
fn widen_annotation(bytes: &[u8], start: usize) -> usize {
    let colon = if bytes.get(start) == Some(&b':') {
        start
    } else {
        match skip_whitespace_back(bytes, start) {
            p if p > 0 && bytes[p - 1] == b':' => p - 1,
            _ => return start,
        }
    };

    match skip_whitespace_back(bytes, colon) {
        p if p > 0 && bytes[p - 1] == b'?' => p - 1,
        _ => colon,
    }
}

fn skip_whitespace_forward(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
        pos += 1;
    }
    pos
}

fn skip_whitespace_back(bytes: &[u8], mut pos: usize) -> usize {
    while pos > 0 && bytes[pos - 1].is_ascii_whitespace() {
        pos -= 1;
    }
    pos
}
