use super::dead_code::DeadCodeFixer;
use super::mutable_default::MutableDefaultFixer;
use super::traits::Fixer;

pub struct FixerRegistry {
    fixers: Vec<Box<dyn Fixer>>,
}

impl FixerRegistry {
    pub fn new(fixers: Vec<Box<dyn Fixer>>) -> Self {
        Self { fixers }
    }

    pub fn find_fixer(&self, rule_id: &str) -> Option<&dyn Fixer> {
        self.fixers
            .iter()
            .find(|f| f.handles().contains(&rule_id))
            .map(|f| f.as_ref())
    }

    /// Every rule id some registered fixer handles, in registration order.
    pub fn supported_rules(&self) -> Vec<&str> {
        self.fixers
            .iter()
            .flat_map(|f| f.handles().iter().copied())
            .collect()
    }
}

pub fn default_registry() -> FixerRegistry {
    let fixers: Vec<Box<dyn Fixer>> = vec![Box::new(MutableDefaultFixer), Box::new(DeadCodeFixer)];
    FixerRegistry::new(fixers)
}
