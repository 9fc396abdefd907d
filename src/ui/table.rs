use tabled::{settings::Style, Table, Tabled};
use crate::sock::Sock;

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

#[derive(Tabled)]
pub struct SockTableRow {
    #[tabled(rename = "Id")]
    pub id: i64,
    #[tabled(rename = "Color")]
    pub color: String,
    #[tabled(rename = "Cotton %")]
    pub cotton_percentage: i64,
    #[tabled(rename = "Quantity")]
    pub quantity: i64,
}

impl From<&Sock> for SockTableRow {
    fn from(sock: &Sock) -> Self {
        Self {
            id: sock.id,
            color: sock.color.clone(),
            cotton_percentage: sock.cotton_percentage,
            quantity: sock.quantity,
        }
    }
}

pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn add_row(&mut self, label: &str, value: &str) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }

        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn stats_table(stats: &[(&str, &str)]) -> String {
    let mut builder = TableBuilder::new();
    for (label, value) in stats {
        builder.add_row(label, value);
    }
    builder.build()
}

pub fn socks_table(socks: &[Sock]) -> String {
    if socks.is_empty() {
        return String::new();
    }
    let rows: Vec<SockTableRow> = socks.iter().map(SockTableRow::from).collect();
    Table::new(rows).with(Style::rounded()).to_string()
}
