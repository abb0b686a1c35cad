//! # Graph Command Implementation
//!
//! This module implements the `graph` subcommand, which displays the project
//! reference tree of each root and the level partition used for scheduling.
//!
//! The graph is fully validated first, so cycles and invalid referenced
//! projects are reported exactly as `build` would report them. This command
//! is read-only.

use std::borrow::Cow;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use ptree::{print_tree, Style, TreeItem};

use tsbuild::filesystem::RealFs;
use tsbuild::graph::{DependencyGraph, NodeIndex};
use tsbuild::loader::load_graph;
use tsbuild::output::{emoji, OutputConfig};
use tsbuild::suggestions;

use super::resolve_roots;

/// Display the project reference graph
#[derive(Args, Debug)]
pub struct GraphArgs {
    /// Root projects: tsconfig.json files or directories containing one
    /// (defaults to ./tsconfig.json)
    #[arg(value_name = "ROOTS")]
    pub roots: Vec<PathBuf>,
}

/// Execute the `graph` command.
pub fn execute(args: GraphArgs, output: &OutputConfig) -> Result<()> {
    let roots = resolve_roots(&RealFs, &args.roots)?;
    let graph = load_graph(&RealFs, &roots).map_err(suggestions::explain)?;

    println!("{} Project references", emoji(output, "🌳", "[GRAPH]"));
    for &root in graph.roots() {
        let tree = build_tree_node(&graph, root);
        print_tree(&tree).map_err(|e| anyhow::anyhow!("Failed to display tree: {}", e))?;
    }
    println!();
    print!("{}", render_levels(&graph));
    io::stdout().flush()?;
    Ok(())
}

/// Tree rooted at `index`, with one child per direct reference.
fn build_tree_node(graph: &DependencyGraph, index: NodeIndex) -> TreeNode {
    let node = graph.node(index);
    TreeNode {
        label: format!("{} ({})", node.name(), node.config_path.display()),
        children: graph
            .dependencies(index)
            .iter()
            .map(|&child| build_tree_node(graph, child))
            .collect(),
    }
}

fn render_levels(graph: &DependencyGraph) -> String {
    let mut out = String::from("Build levels:\n");
    for (number, level) in graph.levels().iter().enumerate() {
        let names: Vec<String> = level.iter().map(|&index| graph.node(index).name()).collect();
        out.push_str(&format!("  {}: {}\n", number + 1, names.join(", ")));
    }
    out
}

/// Tree node structure for ptree visualization
#[derive(Clone)]
struct TreeNode {
    label: String,
    children: Vec<TreeNode>,
}

impl TreeItem for TreeNode {
    type Child = TreeNode;

    fn write_self<W: io::Write>(&self, f: &mut W, _style: &Style) -> io::Result<()> {
        write!(f, "{}", self.label)
    }

    fn children(&self) -> Cow<'_, [Self::Child]> {
        Cow::Borrowed(&self.children)
    }
}
