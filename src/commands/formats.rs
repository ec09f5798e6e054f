use anyhow::Result;

use crate::options::BarcodeFormat;

/// Command to list the barcode format names accepted by `Formats=...`
pub struct FormatsCommand;

impl FormatsCommand {
    pub fn new() -> Self {
        Self
    }

    pub fn names(&self) -> Vec<&'static str> {
        BarcodeFormat::ALL.iter().map(|f| f.name()).collect()
    }

    pub async fn execute(&self) -> Result<()> {
        for name in self.names() {
            println!("{}", name);
        }
        Ok(())
    }
}

impl Default for FormatsCommand {
    fn default() -> Self {
        Self::new()
    }
}
