//! Normalizes a `tree-sitter-python` concrete syntax tree into the uniform
//! [`crate::tree`] model.
//!
//! This is where grammar breadth lives: every construct the grammar can
//! produce is dispatched on [`tree_sitter::Node::kind`] and turned into a
//! fixed, deterministic child layout, following the slot conventions
//! described in the crate's top-level documentation. Punctuation, `ctx`
//! markers and other CST-only scaffolding that the grammar needs but that
//! carries no diffable information are dropped on the way in.

use tree_sitter::Node as Cst;
use typed_arena::Arena;

use crate::error::DiffError;
use crate::tree::{Node, NodeKind, Payload, Tree, TreeBuilder as Alloc};

/// Builds a [`Tree`] from a freshly parsed `tree-sitter` tree.
pub fn build<'a>(
    cst_tree: &tree_sitter::Tree,
    source: &'a str,
    arena: &'a Arena<Node<'a>>,
) -> Result<Tree<'a>, DiffError> {
    let mut alloc = Alloc::new(arena);
    let root = build_node(cst_tree.root_node(), source.as_bytes(), &mut alloc)?;
    Ok(alloc.finish(root))
}

fn text<'a>(cst: Cst<'a>, src: &'a [u8]) -> &'a str {
    cst.utf8_text(src).unwrap_or_default()
}

fn unsupported(cst: Cst<'_>) -> DiffError {
    DiffError::UnsupportedNode {
        kind: cst.kind().to_string(),
        byte_offset: cst.start_byte(),
    }
}

/// All children of `cst`, named and anonymous alike, in source order.
fn all_children<'a>(cst: Cst<'a>) -> Vec<Cst<'a>> {
    let mut cursor = cst.walk();
    let children = cst.children(&mut cursor).collect();
    children
}

fn named<'a>(cst: Cst<'a>) -> Vec<Cst<'a>> {
    let mut cursor = cst.walk();
    cst.named_children(&mut cursor).collect()
}

fn field<'a>(cst: Cst<'a>, name: &str) -> Option<Cst<'a>> {
    cst.child_by_field_name(name)
}

fn fields<'a>(cst: Cst<'a>, name: &'static str) -> Vec<Cst<'a>> {
    let mut cursor = cst.walk();
    cst.children_by_field_name(name, &mut cursor).collect()
}

/// Unwraps the transparent `block` container used for every statement suite
/// (function/class/if/for/while/try/with bodies) into its named children.
fn block_statements<'a>(block: Cst<'a>) -> Vec<Cst<'a>> {
    named(block)
}

/// A single leaf with no children, e.g. an identifier or a literal.
fn leaf<'a>(b: &mut Alloc<'a>, kind: NodeKind, payload: Payload) -> &'a Node<'a> {
    let id = b.reserve_id();
    b.alloc(id, kind, payload, Vec::new())
}

fn identifier_text<'a>(b: &mut Alloc<'a>, name: &str) -> &'a Node<'a> {
    leaf(b, NodeKind::Identifier, Payload::Text(name.to_string()))
}

fn identifier_node<'a>(b: &mut Alloc<'a>, cst: Cst<'a>, src: &'a [u8]) -> &'a Node<'a> {
    identifier_text(b, text(cst, src))
}

fn operator_leaf<'a>(b: &mut Alloc<'a>, symbol: &str) -> &'a Node<'a> {
    leaf(b, NodeKind::Operator, Payload::Text(symbol.to_string()))
}

/// Builds a synthetic [`NodeKind::Group`] wrapping `items`, or `None` if
/// `items` is empty (empty groups are pruned, per the normalization rules).
fn group<'a>(
    b: &mut Alloc<'a>,
    slot: &'static str,
    items: impl IntoIterator<Item = Cst<'a>>,
    src: &'a [u8],
) -> Result<Option<&'a Node<'a>>, DiffError> {
    let id = b.reserve_id();
    let mut children = Vec::new();
    for item in items {
        children.push(build_node(item, src, b)?);
    }
    if children.is_empty() {
        return Ok(None);
    }
    Ok(Some(b.alloc(
        id,
        NodeKind::Group,
        Payload::Text(slot.to_string()),
        children,
    )))
}

fn group_of<'a>(
    b: &mut Alloc<'a>,
    slot: &'static str,
    items: Vec<&'a Node<'a>>,
) -> Option<&'a Node<'a>> {
    if items.is_empty() {
        return None;
    }
    let id = b.reserve_id();
    Some(b.alloc(id, NodeKind::Group, Payload::Text(slot.to_string()), items))
}

fn opt_build<'a>(
    cst: Option<Cst<'a>>,
    src: &'a [u8],
    b: &mut Alloc<'a>,
) -> Result<Option<&'a Node<'a>>, DiffError> {
    cst.map(|c| build_node(c, src, b)).transpose()
}

/// Recursively builds the subtree rooted at `cst`. Reserves `cst`'s own id
/// before recursing into children, preserving the pre-order invariant.
fn build_node<'a>(cst: Cst<'a>, src: &'a [u8], b: &mut Alloc<'a>) -> Result<&'a Node<'a>, DiffError> {
    let id = b.reserve_id();
    match cst.kind() {
        "module" => {
            let mut children = Vec::new();
            for stmt in named(cst) {
                children.push(build_node(stmt, src, b)?);
            }
            Ok(b.alloc(id, NodeKind::Module, Payload::Empty, children))
        }

        "expression_statement" => {
            let inner = named(cst)
                .into_iter()
                .next()
                .ok_or_else(|| unsupported(cst))?;
            let child = build_node(inner, src, b)?;
            Ok(b.alloc(id, NodeKind::ExpressionStatement, Payload::Empty, vec![child]))
        }

        "identifier" => Ok(b.alloc(
            id,
            NodeKind::Identifier,
            Payload::Text(text(cst, src).to_string()),
            Vec::new(),
        )),

        "integer" | "float" => Ok(b.alloc(
            id,
            NodeKind::Number,
            Payload::Text(text(cst, src).to_string()),
            Vec::new(),
        )),

        "string" => {
            let raw = text(cst, src);
            let prefix: String = raw
                .chars()
                .take_while(|c| c.is_alphabetic())
                .collect::<String>()
                .to_lowercase();
            let kind = if prefix.contains('b') {
                NodeKind::BytesLiteral
            } else {
                NodeKind::StringLiteral
            };
            Ok(b.alloc(id, kind, Payload::Text(raw.to_string()), Vec::new()))
        }

        "true" => Ok(b.alloc(id, NodeKind::BoolLiteral, Payload::Bool(true), Vec::new())),
        "false" => Ok(b.alloc(id, NodeKind::BoolLiteral, Payload::Bool(false), Vec::new())),
        "none" => Ok(b.alloc(id, NodeKind::NoneLiteral, Payload::Empty, Vec::new())),
        "ellipsis" => Ok(b.alloc(id, NodeKind::Ellipsis, Payload::Empty, Vec::new())),

        "pass_statement" => Ok(b.alloc(id, NodeKind::Pass, Payload::Empty, Vec::new())),
        "break_statement" => Ok(b.alloc(id, NodeKind::Break, Payload::Empty, Vec::new())),
        "continue_statement" => Ok(b.alloc(id, NodeKind::Continue, Payload::Empty, Vec::new())),

        "return_statement" => {
            let value = opt_build(named(cst).into_iter().next(), src, b)?;
            let children = value.into_iter().collect();
            Ok(b.alloc(id, NodeKind::Return, Payload::Empty, children))
        }

        "raise_statement" => {
            let parts = named(cst);
            let mut children = Vec::new();
            for part in parts {
                children.push(build_node(part, src, b)?);
            }
            Ok(b.alloc(id, NodeKind::Raise, Payload::Empty, children))
        }

        "assert_statement" => {
            let mut children = Vec::new();
            for part in named(cst) {
                children.push(build_node(part, src, b)?);
            }
            Ok(b.alloc(id, NodeKind::Assert, Payload::Empty, children))
        }

        "delete_statement" => {
            let mut children = Vec::new();
            for target in named(cst) {
                children.push(build_node(target, src, b)?);
            }
            Ok(b.alloc(id, NodeKind::Delete, Payload::Empty, children))
        }

        "global_statement" => {
            let children = named(cst)
                .into_iter()
                .map(|n| identifier_node(b, n, src))
                .collect();
            Ok(b.alloc(id, NodeKind::Global, Payload::Empty, children))
        }

        "nonlocal_statement" => {
            let children = named(cst)
                .into_iter()
                .map(|n| identifier_node(b, n, src))
                .collect();
            Ok(b.alloc(id, NodeKind::Nonlocal, Payload::Empty, children))
        }

        "unary_operator" => {
            let op = field(cst, "operator").map(|o| text(o, src)).unwrap_or("?");
            let op_leaf = operator_leaf(b, op);
            let operand = build_node(field(cst, "argument").or_else(|| field(cst, "operand")).ok_or_else(|| unsupported(cst))?, src, b)?;
            Ok(b.alloc(id, NodeKind::UnaryOp, Payload::Empty, vec![op_leaf, operand]))
        }

        "not_operator" => {
            let op_leaf = operator_leaf(b, "not");
            let operand = build_node(field(cst, "argument").ok_or_else(|| unsupported(cst))?, src, b)?;
            Ok(b.alloc(id, NodeKind::UnaryOp, Payload::Empty, vec![op_leaf, operand]))
        }

        "binary_operator" => {
            let left = build_node(field(cst, "left").ok_or_else(|| unsupported(cst))?, src, b)?;
            let op = field(cst, "operator").map(|o| text(o, src)).unwrap_or("?");
            let op_leaf = operator_leaf(b, op);
            let right = build_node(field(cst, "right").ok_or_else(|| unsupported(cst))?, src, b)?;
            Ok(b.alloc(id, NodeKind::BinaryOp, Payload::Empty, vec![left, op_leaf, right]))
        }

        "boolean_operator" => {
            let op = field(cst, "operator").map(|o| text(o, src)).unwrap_or("?");
            let op_leaf = operator_leaf(b, op);
            let left = build_node(field(cst, "left").ok_or_else(|| unsupported(cst))?, src, b)?;
            let right = build_node(field(cst, "right").ok_or_else(|| unsupported(cst))?, src, b)?;
            let values = group_of(b, "Values", vec![left, right]);
            let children = std::iter::once(op_leaf).chain(values).collect();
            Ok(b.alloc(id, NodeKind::BoolOp, Payload::Empty, children))
        }

        "comparison_operator" => {
            let kids = all_children(cst);
            let mut operands = Vec::new();
            let mut operators = Vec::new();
            for kid in kids {
                if kid.is_named() {
                    operands.push(build_node(kid, src, b)?);
                } else {
                    operators.push(text(kid, src).to_string());
                }
            }
            if operands.is_empty() {
                return Err(unsupported(cst));
            }
            let left = operands.remove(0);
            let ops_nodes: Vec<_> = operators.iter().map(|o| operator_leaf(b, o)).collect();
            let ops_group = group_of(b, "Ops", ops_nodes);
            let comparators_group = group_of(b, "Comparators", operands);
            let children = std::iter::once(left).chain(ops_group).chain(comparators_group).collect();
            Ok(b.alloc(id, NodeKind::CompareOp, Payload::Empty, children))
        }

        "attribute" => {
            let object = build_node(field(cst, "object").ok_or_else(|| unsupported(cst))?, src, b)?;
            let attr = field(cst, "attribute").map(|a| text(a, src)).unwrap_or_default();
            let attr_leaf = identifier_text(b, attr);
            Ok(b.alloc(id, NodeKind::Attribute, Payload::Empty, vec![object, attr_leaf]))
        }

        "subscript" => {
            let value = build_node(field(cst, "value").ok_or_else(|| unsupported(cst))?, src, b)?;
            let subs = fields(cst, "subscript");
            let index = if subs.len() == 1 {
                build_node(subs[0], src, b)?
            } else {
                let mut items = Vec::new();
                for s in subs {
                    items.push(build_node(s, src, b)?);
                }
                group_of(b, "Indices", items).ok_or_else(|| unsupported(cst))?
            };
            Ok(b.alloc(id, NodeKind::Subscript, Payload::Empty, vec![value, index]))
        }

        "slice" => {
            let mut slots: [Option<Cst<'a>>; 3] = [None, None, None];
            let mut colon_count = 0usize;
            for kid in all_children(cst) {
                if kid.is_named() {
                    if let Some(slot) = slots.get_mut(colon_count) {
                        *slot = Some(kid);
                    }
                } else if text(kid, src) == ":" {
                    colon_count += 1;
                }
            }
            let mut children = Vec::new();
            for slot in slots {
                if let Some(c) = opt_build(slot, src, b)? {
                    children.push(c);
                }
            }
            Ok(b.alloc(id, NodeKind::Slice, Payload::Empty, children))
        }

        "starred_expression" | "list_splat" | "dictionary_splat" => {
            let inner = named(cst).into_iter().next().ok_or_else(|| unsupported(cst))?;
            let child = build_node(inner, src, b)?;
            Ok(b.alloc(id, NodeKind::Starred, Payload::Empty, vec![child]))
        }

        "call" => {
            let func = build_node(field(cst, "function").ok_or_else(|| unsupported(cst))?, src, b)?;
            let args_cst = field(cst, "arguments");
            let mut positional = Vec::new();
            let mut keywords = Vec::new();
            if let Some(args_cst) = args_cst {
                for arg in named(args_cst) {
                    if arg.kind() == "keyword_argument" {
                        keywords.push(build_keyword(arg, src, b)?);
                    } else {
                        positional.push(build_node(arg, src, b)?);
                    }
                }
            }
            let call_args = group_of(b, "CallArgs", positional);
            let keywords_group = group_of(b, "Keywords", keywords);
            let children = std::iter::once(func).chain(call_args).chain(keywords_group).collect();
            Ok(b.alloc(id, NodeKind::Call, Payload::Empty, children))
        }

        "keyword_argument" => {
            let name = field(cst, "name").map(|n| text(n, src)).unwrap_or_default();
            let name_leaf = identifier_text(b, name);
            let value = build_node(field(cst, "value").ok_or_else(|| unsupported(cst))?, src, b)?;
            Ok(b.alloc(id, NodeKind::Keyword, Payload::Empty, vec![name_leaf, value]))
        }

        "lambda" => {
            let params = opt_build_parameters(field(cst, "parameters"), src, b)?;
            let body = build_node(field(cst, "body").ok_or_else(|| unsupported(cst))?, src, b)?;
            let children = params.into_iter().chain(std::iter::once(body)).collect();
            Ok(b.alloc(id, NodeKind::Lambda, Payload::Empty, children))
        }

        "conditional_expression" => {
            let parts = named(cst);
            if parts.len() != 3 {
                return Err(unsupported(cst));
            }
            let consequence = build_node(parts[0], src, b)?;
            let condition = build_node(parts[1], src, b)?;
            let alternative = build_node(parts[2], src, b)?;
            Ok(b.alloc(
                id,
                NodeKind::ConditionalExpr,
                Payload::Empty,
                vec![condition, consequence, alternative],
            ))
        }

        "list" => {
            let mut items = Vec::new();
            for e in named(cst) {
                items.push(build_node(e, src, b)?);
            }
            let elts = group_of(b, "elts", items);
            Ok(b.alloc(id, NodeKind::ListLiteral, Payload::Empty, elts.into_iter().collect()))
        }

        "tuple" => {
            let mut items = Vec::new();
            for e in named(cst) {
                items.push(build_node(e, src, b)?);
            }
            let elts = group_of(b, "elts", items);
            Ok(b.alloc(id, NodeKind::TupleLiteral, Payload::Empty, elts.into_iter().collect()))
        }

        "set" => {
            let mut children = Vec::new();
            for e in named(cst) {
                children.push(build_node(e, src, b)?);
            }
            Ok(b.alloc(id, NodeKind::SetLiteral, Payload::Empty, children))
        }

        "dictionary" => {
            let mut keys = Vec::new();
            let mut values = Vec::new();
            for entry in named(cst) {
                if entry.kind() == "pair" {
                    let key = field(entry, "key").ok_or_else(|| unsupported(entry))?;
                    let value = field(entry, "value").ok_or_else(|| unsupported(entry))?;
                    keys.push(build_node(key, src, b)?);
                    values.push(build_node(value, src, b)?);
                } else {
                    // `**rest`: no corresponding key, only contributes a value.
                    values.push(build_node(entry, src, b)?);
                }
            }
            let keys_group = group_of(b, "Keys", keys);
            let values_group = group_of(b, "Values", values);
            let children = keys_group.into_iter().chain(values_group).collect();
            Ok(b.alloc(id, NodeKind::DictLiteral, Payload::Empty, children))
        }

        "list_comprehension" | "set_comprehension" | "generator_expression" => {
            let kind = match cst.kind() {
                "list_comprehension" => NodeKind::ListComp,
                "set_comprehension" => NodeKind::SetComp,
                _ => NodeKind::GeneratorExp,
            };
            let elt = build_node(field(cst, "body").ok_or_else(|| unsupported(cst))?, src, b)?;
            let generators = build_generators(cst, src, b)?;
            let children = std::iter::once(elt).chain(generators).collect();
            Ok(b.alloc(id, kind, Payload::Empty, children))
        }

        "dictionary_comprehension" => {
            let pair = field(cst, "body").ok_or_else(|| unsupported(cst))?;
            let key = build_node(field(pair, "key").ok_or_else(|| unsupported(pair))?, src, b)?;
            let value = build_node(field(pair, "value").ok_or_else(|| unsupported(pair))?, src, b)?;
            let generators = build_generators(cst, src, b)?;
            let children = vec![key, value].into_iter().chain(generators).collect();
            Ok(b.alloc(id, NodeKind::DictComp, Payload::Empty, children))
        }

        "yield" => {
            let is_from = all_children(cst).iter().any(|c| !c.is_named() && text(*c, src) == "from");
            let value = opt_build(named(cst).into_iter().next(), src, b)?;
            let children: Vec<_> = value.into_iter().collect();
            let kind = if is_from { NodeKind::YieldFrom } else { NodeKind::Yield };
            Ok(b.alloc(id, kind, Payload::Empty, children))
        }

        "if_statement" => build_if(cst, id, src, b),
        "for_statement" => {
            let left = build_node(field(cst, "left").ok_or_else(|| unsupported(cst))?, src, b)?;
            let right = build_node(field(cst, "right").ok_or_else(|| unsupported(cst))?, src, b)?;
            let body_cst = field(cst, "body").ok_or_else(|| unsupported(cst))?;
            let body = group(b, "Body", block_statements(body_cst), src)?;
            let else_group = match field(cst, "alternative") {
                Some(alt) => group(b, "Else", block_statements(field(alt, "body").unwrap_or(alt)), src)?,
                None => None,
            };
            let children = vec![left, right].into_iter().chain(body).chain(else_group).collect();
            Ok(b.alloc(id, NodeKind::For, Payload::Empty, children))
        }

        "while_statement" => {
            let condition = build_node(field(cst, "condition").ok_or_else(|| unsupported(cst))?, src, b)?;
            let body_cst = field(cst, "body").ok_or_else(|| unsupported(cst))?;
            let body = group(b, "Body", block_statements(body_cst), src)?;
            let else_group = match field(cst, "alternative") {
                Some(alt) => group(b, "Else", block_statements(field(alt, "body").unwrap_or(alt)), src)?,
                None => None,
            };
            let children = std::iter::once(condition).chain(body).chain(else_group).collect();
            Ok(b.alloc(id, NodeKind::While, Payload::Empty, children))
        }

        "try_statement" => {
            let mut body_items = None;
            let mut handlers = Vec::new();
            let mut else_items = None;
            let mut finally_items = None;
            for kid in named(cst) {
                match kid.kind() {
                    "block" => body_items = Some(block_statements(kid)),
                    "except_clause" | "except_group_clause" => handlers.push(kid),
                    "else_clause" => {
                        else_items = Some(block_statements(field(kid, "body").unwrap_or(kid)))
                    }
                    "finally_clause" => {
                        finally_items = Some(block_statements(field(kid, "body").unwrap_or(kid)))
                    }
                    _ => {}
                }
            }
            let body = group(b, "Body", body_items.unwrap_or_default(), src)?;
            let mut handler_nodes = Vec::new();
            for h in handlers {
                handler_nodes.push(build_except_handler(h, src, b)?);
            }
            let handlers_group = group_of(b, "Excepthandlers", handler_nodes);
            let else_group = group(b, "Else", else_items.unwrap_or_default(), src)?;
            let finally_group = group(b, "Finally", finally_items.unwrap_or_default(), src)?;
            let children = body
                .into_iter()
                .chain(handlers_group)
                .chain(else_group)
                .chain(finally_group)
                .collect();
            Ok(b.alloc(id, NodeKind::Try, Payload::Empty, children))
        }

        "with_statement" => {
            let mut items = Vec::new();
            for clause in named(cst) {
                if clause.kind() == "with_clause" {
                    items.extend(named(clause).into_iter().filter(|n| n.kind() == "with_item"));
                } else if clause.kind() == "with_item" {
                    items.push(clause);
                }
            }
            let mut item_nodes = Vec::new();
            for it in items {
                item_nodes.push(build_with_item(it, src, b)?);
            }
            let items_group = group_of(b, "WithItems", item_nodes);
            let body_cst = field(cst, "body").ok_or_else(|| unsupported(cst))?;
            let body = group(b, "Body", block_statements(body_cst), src)?;
            let children = items_group.into_iter().chain(body).collect();
            Ok(b.alloc(id, NodeKind::With, Payload::Empty, children))
        }

        "assignment" => {
            let left = field(cst, "left").ok_or_else(|| unsupported(cst))?;
            let right_cst = field(cst, "right");
            let type_cst = field(cst, "type");
            let left_built = build_node(left, src, b)?;
            let targets = group_of(b, "Targets", vec![left_built]);
            if let Some(type_cst) = type_cst {
                let annotation = build_node(type_cst, src, b)?;
                let value = opt_build(right_cst, src, b)?;
                let children = targets.into_iter().chain(std::iter::once(annotation)).chain(value).collect();
                Ok(b.alloc(id, NodeKind::AnnAssign, Payload::Empty, children))
            } else {
                let value = build_node(right_cst.ok_or_else(|| unsupported(cst))?, src, b)?;
                let children = targets.into_iter().chain(std::iter::once(value)).collect();
                Ok(b.alloc(id, NodeKind::Assign, Payload::Empty, children))
            }
        }

        "augmented_assignment" => {
            let left = build_node(field(cst, "left").ok_or_else(|| unsupported(cst))?, src, b)?;
            let op = field(cst, "operator").map(|o| text(o, src)).unwrap_or("?");
            let op_leaf = operator_leaf(b, op);
            let right = build_node(field(cst, "right").ok_or_else(|| unsupported(cst))?, src, b)?;
            Ok(b.alloc(id, NodeKind::AugAssign, Payload::Empty, vec![left, op_leaf, right]))
        }

        "import_statement" => {
            let mut names = Vec::new();
            for n in named(cst) {
                names.push(build_alias(n, src, b)?);
            }
            Ok(b.alloc(id, NodeKind::Import, Payload::Empty, names))
        }

        "import_from_statement" => {
            let module_cst = field(cst, "module_name");
            let module = match module_cst {
                Some(m) => Some(identifier_node(b, m, src)),
                None => None,
            };
            let mut names = Vec::new();
            for n in named(cst) {
                if n.kind() == "dotted_name" || n.kind() == "relative_import" {
                    continue;
                }
                if Some(n) == module_cst {
                    continue;
                }
                if n.kind() == "wildcard_import" {
                    names.push(identifier_text(b, "*"));
                } else {
                    names.push(build_alias(n, src, b)?);
                }
            }
            let names_group = group_of(b, "Names", names);
            let children = module.into_iter().chain(names_group).collect();
            Ok(b.alloc(id, NodeKind::ImportFrom, Payload::Empty, children))
        }

        "function_definition" => build_function_def(cst, id, src, b, None),
        "class_definition" => build_class_def(cst, id, src, b, None),

        "decorated_definition" => {
            let mut decorators = Vec::new();
            let mut definition = None;
            for kid in named(cst) {
                match kid.kind() {
                    "decorator" => decorators.push(kid),
                    "function_definition" | "class_definition" => definition = Some(kid),
                    _ => {}
                }
            }
            let mut decorator_nodes = Vec::new();
            for d in decorators {
                let inner = named(d).into_iter().next().ok_or_else(|| unsupported(d))?;
                decorator_nodes.push(build_node(inner, src, b)?);
            }
            let decorator_group = group_of(b, "DecoratorList", decorator_nodes);
            let definition = definition.ok_or_else(|| unsupported(cst))?;
            match definition.kind() {
                "function_definition" => build_function_def(definition, id, src, b, decorator_group),
                _ => build_class_def(definition, id, src, b, decorator_group),
            }
        }

        other => Err(DiffError::UnsupportedNode {
            kind: other.to_string(),
            byte_offset: cst.start_byte(),
        }),
    }
}

fn build_keyword<'a>(cst: Cst<'a>, src: &'a [u8], b: &mut Alloc<'a>) -> Result<&'a Node<'a>, DiffError> {
    let inner_id = b.reserve_id();
    let name = field(cst, "name").map(|n| text(n, src)).unwrap_or_default();
    let name_leaf = identifier_text(b, name);
    let value = build_node(field(cst, "value").ok_or_else(|| unsupported(cst))?, src, b)?;
    Ok(b.alloc(inner_id, NodeKind::Keyword, Payload::Empty, vec![name_leaf, value]))
}

fn build_alias<'a>(cst: Cst<'a>, src: &'a [u8], b: &mut Alloc<'a>) -> Result<&'a Node<'a>, DiffError> {
    if cst.kind() == "aliased_import" {
        let inner_id = b.reserve_id();
        let name_cst = field(cst, "name").ok_or_else(|| unsupported(cst))?;
        let alias_cst = field(cst, "alias").ok_or_else(|| unsupported(cst))?;
        let name_leaf = identifier_text(b, &dotted_name(name_cst, src));
        let alias_leaf = identifier_node(b, alias_cst, src);
        Ok(b.alloc(inner_id, NodeKind::Alias, Payload::Empty, vec![name_leaf, alias_leaf]))
    } else {
        let inner_id = b.reserve_id();
        let name_leaf = identifier_text(b, &dotted_name(cst, src));
        Ok(b.alloc(inner_id, NodeKind::Alias, Payload::Empty, vec![name_leaf]))
    }
}

fn dotted_name<'a>(cst: Cst<'a>, src: &'a [u8]) -> String {
    text(cst, src).to_string()
}

fn build_if<'a>(cst: Cst<'a>, id: usize, src: &'a [u8], b: &mut Alloc<'a>) -> Result<&'a Node<'a>, DiffError> {
    let condition = build_node(field(cst, "condition").ok_or_else(|| unsupported(cst))?, src, b)?;
    let consequence = field(cst, "consequence").ok_or_else(|| unsupported(cst))?;
    let body = group(b, "Body", block_statements(consequence), src)?;
    let else_group = match field(cst, "alternative") {
        Some(alt) if alt.kind() == "elif_clause" => {
            let elif_id = b.reserve_id();
            let elif_node = build_if_clause(alt, elif_id, src, b)?;
            group_of(b, "Else", vec![elif_node])
        }
        Some(alt) => group(b, "Else", block_statements(field(alt, "body").unwrap_or(alt)), src)?,
        None => None,
    };
    let children = std::iter::once(condition).chain(body).chain(else_group).collect();
    Ok(b.alloc(id, NodeKind::If, Payload::Empty, children))
}

/// Builds an `elif_clause` as a nested [`NodeKind::If`], mirroring how
/// `ast.If.orelse` represents an `elif` as a single-element list.
fn build_if_clause<'a>(cst: Cst<'a>, id: usize, src: &'a [u8], b: &mut Alloc<'a>) -> Result<&'a Node<'a>, DiffError> {
    let condition = build_node(field(cst, "condition").ok_or_else(|| unsupported(cst))?, src, b)?;
    let consequence = field(cst, "consequence").ok_or_else(|| unsupported(cst))?;
    let body = group(b, "Body", block_statements(consequence), src)?;
    let else_group = match field(cst, "alternative") {
        Some(alt) if alt.kind() == "elif_clause" => {
            let elif_id = b.reserve_id();
            let elif_node = build_if_clause(alt, elif_id, src, b)?;
            group_of(b, "Else", vec![elif_node])
        }
        Some(alt) => group(b, "Else", block_statements(field(alt, "body").unwrap_or(alt)), src)?,
        None => None,
    };
    let children = std::iter::once(condition).chain(body).chain(else_group).collect();
    Ok(b.alloc(id, NodeKind::If, Payload::Empty, children))
}

fn build_except_handler<'a>(cst: Cst<'a>, src: &'a [u8], b: &mut Alloc<'a>) -> Result<&'a Node<'a>, DiffError> {
    let handler_id = b.reserve_id();
    let mut block = None;
    let mut rest = Vec::new();
    for kid in named(cst) {
        if kid.kind() == "block" {
            block = Some(kid);
        } else {
            rest.push(kid);
        }
    }
    let mut children = Vec::new();
    if let Some(exc_type) = rest.first() {
        children.push(build_node(*exc_type, src, b)?);
    }
    if let Some(as_name) = rest.get(1) {
        children.push(identifier_node(b, *as_name, src));
    }
    let body = group(
        b,
        "Body",
        block.map(block_statements).unwrap_or_default(),
        src,
    )?;
    children.extend(body);
    Ok(b.alloc(handler_id, NodeKind::ExceptHandler, Payload::Empty, children))
}

fn build_with_item<'a>(cst: Cst<'a>, src: &'a [u8], b: &mut Alloc<'a>) -> Result<&'a Node<'a>, DiffError> {
    let item_id = b.reserve_id();
    let value_cst = field(cst, "value").or_else(|| named(cst).into_iter().next());
    let value_cst = value_cst.ok_or_else(|| unsupported(cst))?;
    let mut children = Vec::new();
    if value_cst.kind() == "as_pattern" {
        let parts = named(value_cst);
        if let Some(ctx_expr) = parts.first() {
            children.push(build_node(*ctx_expr, src, b)?);
        }
        if let Some(target) = parts.get(1) {
            children.push(build_node(*target, src, b)?);
        }
    } else {
        children.push(build_node(value_cst, src, b)?);
    }
    Ok(b.alloc(item_id, NodeKind::WithItem, Payload::Empty, children))
}

fn build_generators<'a>(
    cst: Cst<'a>,
    src: &'a [u8],
    b: &mut Alloc<'a>,
) -> Result<Option<&'a Node<'a>>, DiffError> {
    let id = b.reserve_id();
    let mut comprehensions: Vec<&'a Node<'a>> = Vec::new();
    for kid in named(cst) {
        match kid.kind() {
            "for_in_clause" => {
                let comp_id = b.reserve_id();
                let target = build_node(field(kid, "left").ok_or_else(|| unsupported(kid))?, src, b)?;
                let iter = build_node(field(kid, "right").ok_or_else(|| unsupported(kid))?, src, b)?;
                comprehensions.push(b.alloc(comp_id, NodeKind::Comprehension, Payload::Empty, vec![target, iter]));
            }
            "if_clause" => {
                let cond_cst = named(kid).into_iter().next().ok_or_else(|| unsupported(kid))?;
                let cond = build_node(cond_cst, src, b)?;
                if let Some(last) = comprehensions.last_mut() {
                    let mut children = last.children.clone();
                    children.push(cond);
                    let new_id = last.id;
                    *last = b.alloc(new_id, NodeKind::Comprehension, Payload::Empty, children);
                }
            }
            _ => {}
        }
    }
    if comprehensions.is_empty() {
        return Ok(None);
    }
    Ok(Some(b.alloc(
        id,
        NodeKind::Group,
        Payload::Text("Generators".to_string()),
        comprehensions,
    )))
}

fn opt_build_parameters<'a>(
    cst: Option<Cst<'a>>,
    src: &'a [u8],
    b: &mut Alloc<'a>,
) -> Result<Option<&'a Node<'a>>, DiffError> {
    let Some(cst) = cst else { return Ok(None) };
    let params_id = b.reserve_id();
    let mut entries = Vec::new();
    for p in named(cst) {
        entries.push(build_parameter(p, src, b)?);
    }
    let args_group = group_of(b, "Args", entries);
    let children: Vec<_> = args_group.into_iter().collect();
    if children.is_empty() {
        return Ok(None);
    }
    Ok(Some(b.alloc(params_id, NodeKind::Parameters, Payload::Empty, children)))
}

fn build_parameter<'a>(cst: Cst<'a>, src: &'a [u8], b: &mut Alloc<'a>) -> Result<&'a Node<'a>, DiffError> {
    let param_id = b.reserve_id();
    let children = match cst.kind() {
        "identifier" => vec![identifier_node(b, cst, src)],
        "default_parameter" => {
            let name = field(cst, "name").ok_or_else(|| unsupported(cst))?;
            let value = build_node(field(cst, "value").ok_or_else(|| unsupported(cst))?, src, b)?;
            vec![identifier_node(b, name, src), value]
        }
        "typed_parameter" => {
            let name_cst = named(cst).into_iter().next().ok_or_else(|| unsupported(cst))?;
            let name_leaf = identifier_node(b, name_cst, src);
            let mut v = vec![name_leaf];
            if let Some(t) = field(cst, "type") {
                v.push(build_node(t, src, b)?);
            }
            let marker = leading_splat_marker(cst, src, b);
            marker.into_iter().chain(v).collect()
        }
        "typed_default_parameter" => {
            let name = field(cst, "name").ok_or_else(|| unsupported(cst))?;
            let mut v = vec![identifier_node(b, name, src)];
            if let Some(t) = field(cst, "type") {
                v.push(build_node(t, src, b)?);
            }
            v.push(build_node(field(cst, "value").ok_or_else(|| unsupported(cst))?, src, b)?);
            v
        }
        "list_splat_pattern" => {
            let marker = operator_leaf(b, "*");
            let inner = named(cst).into_iter().next();
            std::iter::once(marker).chain(opt_build(inner, src, b)?).collect()
        }
        "dictionary_splat_pattern" => {
            let marker = operator_leaf(b, "**");
            let inner = named(cst).into_iter().next();
            std::iter::once(marker).chain(opt_build(inner, src, b)?).collect()
        }
        _ => vec![build_node(cst, src, b)?],
    };
    Ok(b.alloc(param_id, NodeKind::Parameter, Payload::Empty, children))
}

fn leading_splat_marker<'a>(cst: Cst<'a>, src: &'a [u8], b: &mut Alloc<'a>) -> Option<&'a Node<'a>> {
    all_children(cst)
        .into_iter()
        .find(|c| !c.is_named() && (text(*c, src) == "*" || text(*c, src) == "**"))
        .map(|c| operator_leaf(b, text(c, src)))
}

fn build_function_def<'a>(
    cst: Cst<'a>,
    id: usize,
    src: &'a [u8],
    b: &mut Alloc<'a>,
    decorator_group: Option<&'a Node<'a>>,
) -> Result<&'a Node<'a>, DiffError> {
    let name_cst = field(cst, "name").ok_or_else(|| unsupported(cst))?;
    let name_leaf = identifier_node(b, name_cst, src);
    let parameters = opt_build_parameters(field(cst, "parameters"), src, b)?;
    let body_cst = field(cst, "body").ok_or_else(|| unsupported(cst))?;
    let body = group(b, "Body", block_statements(body_cst), src)?;
    let children = std::iter::once(name_leaf)
        .chain(parameters)
        .chain(body)
        .chain(decorator_group)
        .collect();
    Ok(b.alloc(id, NodeKind::FunctionDef, Payload::Empty, children))
}

fn build_class_def<'a>(
    cst: Cst<'a>,
    id: usize,
    src: &'a [u8],
    b: &mut Alloc<'a>,
    decorator_group: Option<&'a Node<'a>>,
) -> Result<&'a Node<'a>, DiffError> {
    let name_cst = field(cst, "name").ok_or_else(|| unsupported(cst))?;
    let name_leaf = identifier_node(b, name_cst, src);
    let mut bases = Vec::new();
    let mut keywords = Vec::new();
    if let Some(args) = field(cst, "superclasses") {
        for a in named(args) {
            if a.kind() == "keyword_argument" {
                keywords.push(build_keyword(a, src, b)?);
            } else {
                bases.push(build_node(a, src, b)?);
            }
        }
    }
    let bases_group = group_of(b, "ClassBases", bases);
    let keywords_group = group_of(b, "Keywords", keywords);
    let body_cst = field(cst, "body").ok_or_else(|| unsupported(cst))?;
    let body = group(b, "Body", block_statements(body_cst), src)?;
    let children = std::iter::once(name_leaf)
        .chain(bases_group)
        .chain(keywords_group)
        .chain(body)
        .chain(decorator_group)
        .collect();
    Ok(b.alloc(id, NodeKind::ClassDef, Payload::Empty, children))
}

#[cfg(test)]
mod tests {
    use crate::test_utils::ctx;
    use crate::tree::NodeKind;

    #[test]
    fn builds_a_module_with_one_statement() {
        let ctx = ctx();
        let tree = ctx.parse("a + b");
        assert_eq!(tree.root().kind, NodeKind::Module);
        assert_eq!(tree.root().children.len(), 1);
    }

    #[test]
    fn binary_op_has_three_children() {
        let ctx = ctx();
        let tree = ctx.parse("a + b");
        let expr_stmt = tree.root().children[0];
        let bin_op = expr_stmt.children[0];
        assert_eq!(bin_op.kind, NodeKind::BinaryOp);
        assert_eq!(bin_op.children.len(), 3);
    }

    #[test]
    fn function_def_groups_body() {
        let ctx = ctx();
        let tree = ctx.parse("def f():\n    a + b\n");
        let func = tree.root().children[0];
        assert_eq!(func.kind, NodeKind::FunctionDef);
        assert!(func.children.iter().any(|c| c.kind == NodeKind::Group));
    }

    #[test]
    fn unsupported_node_is_rejected() {
        let ctx = ctx();
        // match statements aren't in the allow-list
        let result = ctx.try_parse("match x:\n    case 1:\n        pass\n");
        assert!(result.is_err());
    }

    #[test]
    fn rejects_parse_errors() {
        let ctx = ctx();
        let result = ctx.try_parse("def f(:\n");
        assert!(result.is_err());
    }
}
