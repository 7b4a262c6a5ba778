/// Options of the ledger grammar.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct ParserSettings {
    commodities: Vec<String>,
}

impl ParserSettings {
    /// Adds a commodity symbol recognized next to amounts.
    pub fn with_commodity(mut self, symbol: &str) -> Self {
        if !symbol.is_empty() && !self.commodities.iter().any(|c| c == symbol) {
            self.commodities.push(symbol.to_string());
            // longest symbol wins when one is a prefix of another
            self.commodities.sort_by(|a, b| b.len().cmp(&a.len()));
        }
        self
    }

    pub fn commodities(&self) -> &[String] {
        &self.commodities
    }
}

impl Default for ParserSettings {
    fn default() -> Self {
        Self {
            commodities: vec!["USD".to_string(), "EUR".to_string(), "$".to_string()],
        }
    }
}
