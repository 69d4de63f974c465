use std::fmt::Write;

/// Index of a node inside the [`Arena`] that created it.
pub type NodeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectKind {
    In,        // <
    OutTrunc,  // >
    OutAppend, // >>
    Heredoc,   // <<
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub kind: RedirectKind,
    pub target: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Command {
    pub argv: Vec<String>,
    /// Applied in order; a later redirect of the same descriptor wins.
    pub redirs: Vec<Redirect>,
}

impl Command {
    pub fn name(&self) -> Option<&str> {
        self.argv.first().map(|s| s.as_str())
    }
}

/// A flat list of stages; the parser never nests pipelines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pipeline {
    pub cmds: Vec<Command>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    AndIf,
    OrIf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Logical {
    pub op: LogicalOp,
    pub lhs: NodeId,
    pub rhs: NodeId,
}

impl Logical {
    /// Short-circuit rule: should `rhs` run given the status of `lhs`?
    pub fn runs_rhs(&self, lhs_status: i32) -> bool {
        match self.op {
            LogicalOp::AndIf => lhs_status == 0,
            LogicalOp::OrIf => lhs_status != 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AstNode {
    Command(Command),
    Pipeline(Pipeline),
    Logical(Logical),
}

/// Append-only owner of every node produced by one parse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Arena {
    nodes: Vec<AstNode>,
}

impl Arena {
    pub fn new() -> Self {
        Arena { nodes: Vec::new() }
    }

    pub fn add(&mut self, node: AstNode) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    pub fn get(&self, id: NodeId) -> Option<&AstNode> {
        self.nodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &AstNode)> {
        self.nodes.iter().enumerate()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListItem {
    pub node: NodeId,
    pub background: bool,
}

/// Top-level statements in textual order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sequence {
    pub items: Vec<ListItem>,
}

impl Sequence {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Render the statements of a parse as an indented tree.
pub fn dump(arena: &Arena, seq: &Sequence) -> String {
    let mut out = String::new();
    for item in &seq.items {
        dump_node(arena, item.node, 0, &mut out);
        if item.background {
            out.push_str("&\n");
        }
    }
    out
}

fn indent(out: &mut String, level: usize) {
    for _ in 0..level {
        out.push_str("  ");
    }
}

fn dump_command(cmd: &Command, level: usize, out: &mut String) {
    indent(out, level);
    let _ = writeln!(out, "Command: {}", cmd.argv.join(" "));
    for r in &cmd.redirs {
        indent(out, level + 1);
        let op = match r.kind {
            RedirectKind::In => "<",
            RedirectKind::OutTrunc => ">",
            RedirectKind::OutAppend => ">>",
            RedirectKind::Heredoc => "<<",
        };
        let _ = writeln!(out, "{} {}", op, r.target);
    }
}

fn dump_node(arena: &Arena, id: NodeId, level: usize, out: &mut String) {
    match arena.get(id) {
        Some(AstNode::Command(cmd)) => dump_command(cmd, level, out),
        Some(AstNode::Pipeline(p)) => {
            indent(out, level);
            out.push_str("Pipeline:\n");
            for cmd in &p.cmds {
                dump_command(cmd, level + 1, out);
            }
        }
        Some(AstNode::Logical(l)) => {
            indent(out, level);
            out.push_str(match l.op {
                LogicalOp::AndIf => "AndIf:\n",
                LogicalOp::OrIf => "OrIf:\n",
            });
            dump_node(arena, l.lhs, level + 1, out);
            dump_node(arena, l.rhs, level + 1, out);
        }
        None => {
            indent(out, level);
            let _ = writeln!(out, "<invalid node {}>", id);
        }
    }
}
