//! Token-budgeted context packing: turn scored recall output into a
//! text block, highest score first, stopping at the budget.

use std::sync::OnceLock;

use tiktoken_rs::CoreBPE;

use valet_core::memory::MemoryEntity;

use crate::scorer::ScoredItem;

fn bpe() -> &'static CoreBPE {
    static BPE: OnceLock<CoreBPE> = OnceLock::new();
    BPE.get_or_init(|| tiktoken_rs::cl100k_base().expect("cl100k_base is embedded"))
}

/// Count tokens the way the context consumer will.
pub fn count_tokens(text: &str) -> usize {
    bpe().encode_with_special_tokens(text).len()
}

/// Render one entity as a context line.
fn render(item: &ScoredItem) -> String {
    match &item.entity {
        MemoryEntity::Fact(f) => format!(
            "- [fact {:.2}] {} {}: {}",
            item.effective_confidence, f.subject, f.predicate, f.content
        ),
        MemoryEntity::Rule(r) => format!(
            "- [rule/{} {:.2}] {}",
            r.maturity, item.effective_confidence, r.content
        ),
        MemoryEntity::Episode(e) => format!("- [episode] {}", e.content),
    }
}

/// Pack scored items (already best-first) into a text block that stays
/// within `token_budget`. Items that do not fit are dropped, never
/// truncated mid-line.
pub fn pack_context(items: &[ScoredItem], token_budget: usize) -> String {
    let header = "Relevant memory, most relevant first:";
    let mut used = count_tokens(header);
    let mut lines = vec![header.to_string()];

    for item in items {
        let line = render(item);
        let cost = count_tokens(&line);
        if used + cost > token_budget {
            break;
        }
        used += cost;
        lines.push(line);
    }

    if lines.len() == 1 {
        return String::new();
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use valet_core::memory::{Fact, Permanence};

    fn item(content: &str, score: f64) -> ScoredItem {
        ScoredItem {
            entity: MemoryEntity::Fact(Fact::new(
                "user",
                "pred",
                content,
                Permanence::Standard,
                "global",
                None,
                vec![],
                vec![],
            )),
            score,
            rrf_score: score,
            effective_confidence: 1.0,
        }
    }

    #[test]
    fn packs_best_first_within_budget() {
        let items = vec![item("first and most relevant", 0.9), item("second", 0.5)];
        let block = pack_context(&items, 10_000);
        let first = block.find("first").unwrap();
        let second = block.find("second").unwrap();
        assert!(first < second);
    }

    #[test]
    fn tight_budget_drops_tail_items() {
        let items = vec![item("short", 0.9), item(&"long ".repeat(400), 0.5)];
        let block = pack_context(&items, 40);
        assert!(block.contains("short"));
        assert!(!block.contains("long long"));
    }

    #[test]
    fn zero_fit_yields_empty_block() {
        let items = vec![item(&"word ".repeat(100), 0.9)];
        assert_eq!(pack_context(&items, 5), "");
    }
}
