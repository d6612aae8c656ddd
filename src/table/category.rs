//! The fixed set of expense categories and their two labels.
//!
//! Each variant carries both its English and Arabic label, so the
//! English-to-Arabic and Arabic-to-English lookups cannot drift apart.

pub const UNCATEGORIZED: &str = "Uncategorized";
pub const UNCATEGORIZED_AR: &str = "غير مصنف";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
  FoodAndBeverages,
  ServicesAndLabor,
  PartyAndEventSupplies,
  UtilitiesAndCleaning,
  EquipmentAndMiscellaneous,
  AmbienceAndFragrances,
}

impl Category {
  pub const ALL: [Category; 6] = [
    Category::FoodAndBeverages,
    Category::ServicesAndLabor,
    Category::PartyAndEventSupplies,
    Category::UtilitiesAndCleaning,
    Category::EquipmentAndMiscellaneous,
    Category::AmbienceAndFragrances,
  ];

  pub fn english(self) -> &'static str {
    match self {
      Category::FoodAndBeverages => "Food & Beverages",
      Category::ServicesAndLabor => "Services & Labor",
      Category::PartyAndEventSupplies => "Party & Event Supplies",
      Category::UtilitiesAndCleaning => "Utilities & Cleaning",
      Category::EquipmentAndMiscellaneous => "Equipment & Miscellaneous",
      Category::AmbienceAndFragrances => "Ambience & Fragrances",
    }
  }

  pub fn arabic(self) -> &'static str {
    match self {
      Category::FoodAndBeverages => "المأكولات والمشروبات",
      Category::ServicesAndLabor => "الخدمات والعمالة",
      Category::PartyAndEventSupplies => "مستلزمات الحفلات والفعاليات",
      Category::UtilitiesAndCleaning => "المرافق والتنظيف",
      Category::EquipmentAndMiscellaneous => "المعدات والمتفرقات",
      Category::AmbienceAndFragrances => "الأجواء والعطور",
    }
  }

  pub fn from_english(label: &str) -> Option<Category> {
    Self::ALL.into_iter().find(|c| c.english() == label)
  }

  pub fn from_arabic(label: &str) -> Option<Category> {
    Self::ALL.into_iter().find(|c| c.arabic() == label)
  }

  /// Arabic label for an English one, or the uncategorized marker.
  pub fn arabic_for(english: &str) -> &'static str {
    Self::from_english(english).map_or(UNCATEGORIZED_AR, Category::arabic)
  }

  /// English label for an Arabic one, or the uncategorized marker.
  pub fn english_for(arabic: &str) -> &'static str {
    Self::from_arabic(arabic).map_or(UNCATEGORIZED, Category::english)
  }
}
