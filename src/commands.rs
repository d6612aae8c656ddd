//! Command-line commands and category name matching

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::table::{Category, ExpenseFields};

#[derive(Debug, Subcommand)]
pub enum Command {
  /// Sign in with a phone number (unknown numbers get read-only access)
  Login { phone: String },
  /// Forget the saved phone number
  Logout,
  /// Show the signed-in user
  Whoami,
  /// List expense records
  List {
    /// Bypass the cache and fetch from the server
    #[arg(short, long)]
    refresh: bool,
    #[arg(short, long)]
    category: Option<String>,
    /// Case-insensitive text to look for in item names
    #[arg(short, long)]
    search: Option<String>,
    #[arg(short, long)]
    year: Option<String>,
    /// Print signed download links for attachments
    #[arg(long)]
    links: bool,
  },
  /// Yearly totals and a category comparison between two years
  Summary {
    #[arg(short, long)]
    refresh: bool,
    #[arg(long, default_value = "1446")]
    year: String,
    #[arg(long, default_value = "1445")]
    compare: String,
  },
  /// Show the known categories
  Categories,
  /// Add an expense record
  Add(RecordArgs),
  /// Change fields of an existing record
  Update {
    record_id: String,
    #[command(flatten)]
    args: RecordArgs,
  },
  /// Delete a record
  Delete { record_id: String },
  /// Upload files to blob storage and print their URLs
  Upload {
    #[arg(required = true)]
    files: Vec<PathBuf>,
  },
}

#[derive(Debug, Default, Args)]
pub struct RecordArgs {
  /// Hijri year tag, e.g. 1446
  #[arg(long)]
  pub year: Option<String>,
  #[arg(long)]
  pub item: Option<String>,
  #[arg(long)]
  pub unit: Option<String>,
  #[arg(long)]
  pub quantity: Option<f64>,
  #[arg(long)]
  pub unit_price: Option<f64>,
  /// Category name, alias or prefix (English or Arabic)
  #[arg(long)]
  pub category: Option<String>,
  /// Mark as paid; `--paid false` clears it
  #[arg(long, num_args = 0..=1, default_missing_value = "true")]
  pub paid: Option<bool>,
  /// Files to upload and attach
  #[arg(long = "attach")]
  pub attachments: Vec<PathBuf>,
}

impl RecordArgs {
  /// Fields set by these arguments only; absent arguments stay absent.
  pub fn to_fields(&self) -> Result<ExpenseFields, String> {
    let mut fields = ExpenseFields {
      eid_year: self.year.clone(),
      item: self.item.clone(),
      unit: self.unit.clone(),
      quantity: self.quantity,
      unit_price: self.unit_price,
      paid: self.paid,
      ..Default::default()
    };

    if let Some(input) = &self.category {
      let category =
        resolve_category(input).ok_or_else(|| format!("Unknown category: {}", input))?;
      fields.category = Some(category.english().to_string());
      fields.arabic_category = Some(category.arabic().to_string());
    }

    Ok(fields)
  }
}

/// Short names accepted for each category
const ALIASES: &[(Category, &[&str])] = &[
  (Category::FoodAndBeverages, &["food", "drinks", "beverages"]),
  (Category::ServicesAndLabor, &["services", "labor", "labour"]),
  (Category::PartyAndEventSupplies, &["party", "event", "events", "supplies"]),
  (Category::UtilitiesAndCleaning, &["utilities", "cleaning"]),
  (Category::EquipmentAndMiscellaneous, &["equipment", "misc"]),
  (Category::AmbienceAndFragrances, &["ambience", "fragrances", "incense"]),
];

/// Categories matching `input`, best match first
pub fn category_suggestions(input: &str) -> Vec<Category> {
  let input_lower = input.trim().to_lowercase();

  if input_lower.is_empty() {
    return Category::ALL.to_vec();
  }

  let mut matches: Vec<(Category, u32)> = Vec::new();

  for (category, aliases) in ALIASES {
    let english = category.english().to_lowercase();
    let arabic = category.arabic();

    // Exact match on either label
    if english == input_lower || arabic == input_lower {
      matches.push((*category, 0)); // Highest priority
      continue;
    }

    // Exact match on alias
    if aliases.contains(&input_lower.as_str()) {
      matches.push((*category, 1));
      continue;
    }

    // Prefix match on either label
    if english.starts_with(&input_lower) || arabic.starts_with(&input_lower) {
      matches.push((*category, 2));
      continue;
    }

    // Substring match
    if english.contains(&input_lower) || arabic.contains(&input_lower) {
      matches.push((*category, 3));
    }
  }

  // Sort by priority
  matches.sort_by_key(|(_, priority)| *priority);

  matches.into_iter().map(|(category, _)| category).collect()
}

/// The single best category for `input`
pub fn resolve_category(input: &str) -> Option<Category> {
  if input.trim().is_empty() {
    return None;
  }
  category_suggestions(input).into_iter().next()
}

#[cfg(test)]
mod tests {
  use super::*;
  use clap::Parser;

  #[derive(Parser)]
  struct Cli {
    #[command(subcommand)]
    command: Command,
  }

  fn parse_add(args: &[&str]) -> RecordArgs {
    let argv = ["eidx", "add"].iter().chain(args.iter());
    match Cli::try_parse_from(argv).unwrap().command {
      Command::Add(args) => args,
      other => panic!("unexpected command {:?}", other),
    }
  }

  #[test]
  fn test_paid_is_a_flag_with_optional_value() {
    assert_eq!(parse_add(&["--paid", "--item", "Dates"]).paid, Some(true));
    assert_eq!(parse_add(&["--item", "Dates", "--paid"]).paid, Some(true));
    assert_eq!(parse_add(&["--paid", "false"]).paid, Some(false));
    assert_eq!(parse_add(&["--item", "Dates"]).paid, None);
  }

  #[test]
  fn test_empty_input_returns_all() {
    assert_eq!(category_suggestions("").len(), Category::ALL.len());
    assert_eq!(resolve_category("  "), None);
  }

  #[test]
  fn test_exact_match() {
    assert_eq!(resolve_category("Food & Beverages"), Some(Category::FoodAndBeverages));
    assert_eq!(resolve_category("الخدمات والعمالة"), Some(Category::ServicesAndLabor));
  }

  #[test]
  fn test_alias_match() {
    assert_eq!(resolve_category("misc"), Some(Category::EquipmentAndMiscellaneous));
    assert_eq!(resolve_category("Labour"), Some(Category::ServicesAndLabor));
  }

  #[test]
  fn test_prefix_match() {
    assert_eq!(resolve_category("amb"), Some(Category::AmbienceAndFragrances));
    assert_eq!(resolve_category("المرافق"), Some(Category::UtilitiesAndCleaning));
  }

  #[test]
  fn test_substring_match() {
    assert_eq!(resolve_category("fragr"), Some(Category::AmbienceAndFragrances));
    assert_eq!(resolve_category("nothing like it"), None);
  }

  #[test]
  fn test_record_args_to_fields() {
    let args = RecordArgs {
      item: Some("Lamb".into()),
      quantity: Some(2.0),
      category: Some("food".into()),
      ..Default::default()
    };
    let fields = args.to_fields().unwrap();
    assert_eq!(fields.item.as_deref(), Some("Lamb"));
    assert_eq!(fields.category.as_deref(), Some("Food & Beverages"));
    assert_eq!(fields.arabic_category.as_deref(), Some("المأكولات والمشروبات"));
    assert_eq!(fields.unit_price, None);

    let bad = RecordArgs {
      category: Some("zzz".into()),
      ..Default::default()
    };
    assert!(bad.to_fields().is_err());
  }
}
