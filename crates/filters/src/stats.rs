// crates/filters/src/stats.rs

#[derive(Clone, Debug, Default)]
pub struct FilterStats {
    pub matches: usize,
    pub misses: usize,
    pub last_rule: Option<String>,
}

impl FilterStats {
    pub(crate) fn record(&mut self, rule: Option<&str>) {
        match rule {
            Some(pattern) => {
                self.matches += 1;
                self.last_rule = Some(pattern.to_string());
            }
            None => self.misses += 1,
        }
    }
}
