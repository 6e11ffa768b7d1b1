use chrono::Utc;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::store::CollectionKind;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    #[default]
    Ar,
    En,
}

impl Lang {
    pub fn display_name(self) -> &'static str {
        match self {
            Lang::Ar => "Arabic",
            Lang::En => "English",
        }
    }
}

/// Bilingual text pair.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct Localized {
    #[serde(default)]
    pub ar: String,
    #[serde(default)]
    pub en: String,
}

impl Localized {
    pub fn get(&self, lang: Lang) -> &str {
        match lang {
            Lang::Ar => &self.ar,
            Lang::En => &self.en,
        }
    }

    /// Copies the Arabic text into an empty English slot.
    pub fn fill_english(&mut self) {
        if self.en.trim().is_empty() {
            self.en = self.ar.clone();
        }
    }

    fn contains(&self, lang: Lang, needle: &str) -> bool {
        self.get(lang).to_lowercase().contains(needle)
    }
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

fn has_arabic_text(value: &Localized) -> Result<(), ValidationError> {
    if value.ar.trim().is_empty() {
        return Err(ValidationError::new("arabic_text_required"));
    }
    Ok(())
}

/// Query string accepted by the public list routes.
#[derive(Debug, Deserialize, Default)]
pub struct ListQuery {
    pub q: Option<String>,
    pub category: Option<String>,
    pub lang: Option<Lang>,
}

impl ListQuery {
    fn needle(&self) -> Option<String> {
        self.q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase)
    }

    fn category_matches(&self, category: &str) -> bool {
        match self.category.as_deref() {
            None | Some("") | Some("all") => true,
            Some(wanted) => wanted.eq_ignore_ascii_case(category),
        }
    }
}

/// A record kept in one of the site collections.
pub trait Record: Serialize + DeserializeOwned + Validate + Clone + Send + Sync + 'static {
    const KIND: CollectionKind;

    fn id(&self) -> &str;

    fn set_id(&mut self, id: String);

    /// Fills empty fields with server-side defaults before a write. Fields the
    /// client already set are left alone, so this is safe on updates too.
    fn fill_defaults(&mut self) {}

    fn matches(&self, _query: &ListQuery) -> bool {
        true
    }
}

/// Display date stamped on server-created articles and inquiries.
pub fn display_date() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Validate)]
pub struct Product {
    #[serde(default)]
    pub id: String,
    #[validate(custom = "has_arabic_text")]
    pub name: Localized,
    #[serde(default)]
    pub description: Localized,
    #[serde(default)]
    pub images: Vec<String>,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
}

impl Record for Product {
    const KIND: CollectionKind = CollectionKind::Products;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn fill_defaults(&mut self) {
        self.name.fill_english();
        self.description.fill_english();
    }

    fn matches(&self, query: &ListQuery) -> bool {
        if !query.category_matches(&self.category) {
            return false;
        }
        let lang = query.lang.unwrap_or_default();
        match query.needle() {
            Some(needle) => {
                self.name.contains(lang, &needle) || self.description.contains(lang, &needle)
            }
            None => true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Validate)]
pub struct Article {
    #[serde(default)]
    pub id: String,
    #[validate(custom = "has_arabic_text")]
    pub title: Localized,
    #[serde(default)]
    pub content: Localized,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub date: String,
}

impl Record for Article {
    const KIND: CollectionKind = CollectionKind::Articles;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn fill_defaults(&mut self) {
        self.title.fill_english();
        self.content.fill_english();
        if self.date.is_empty() {
            self.date = display_date();
        }
    }

    fn matches(&self, query: &ListQuery) -> bool {
        let lang = query.lang.unwrap_or_default();
        match query.needle() {
            Some(needle) => {
                self.title.contains(lang, &needle) || self.content.contains(lang, &needle)
            }
            None => true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GalleryCategory {
    Products,
    Factory,
    Process,
}

impl GalleryCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            GalleryCategory::Products => "products",
            GalleryCategory::Factory => "factory",
            GalleryCategory::Process => "process",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Validate)]
pub struct GalleryItem {
    #[serde(default)]
    pub id: String,
    #[validate(length(min = 1))]
    pub url: String,
    #[serde(default)]
    pub title: Localized,
    pub category: GalleryCategory,
}

impl Record for GalleryItem {
    const KIND: CollectionKind = CollectionKind::Gallery;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn fill_defaults(&mut self) {
        self.title.fill_english();
    }

    fn matches(&self, query: &ListQuery) -> bool {
        query.category_matches(self.category.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Validate)]
pub struct Review {
    #[serde(default)]
    pub id: String,
    #[validate(length(min = 1))]
    pub author: String,
    #[validate(range(min = 1, max = 5))]
    pub rating: i32,
    #[serde(default)]
    pub comment: Localized,
    #[serde(default)]
    pub avatar: String,
}

impl Record for Review {
    const KIND: CollectionKind = CollectionKind::Reviews;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn fill_defaults(&mut self) {
        self.comment.fill_english();
        if self.avatar.is_empty() {
            self.avatar = format!("https://i.pravatar.cc/150?u={}", self.author);
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Validate)]
pub struct Inquiry {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub email: String,
    pub msg: String,
    #[serde(default)]
    pub date: String,
}

impl Record for Inquiry {
    const KIND: CollectionKind = CollectionKind::Inquiries;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn fill_defaults(&mut self) {
        if self.date.is_empty() {
            self.date = display_date();
        }
    }
}

/// Body of the public contact form.
#[derive(Debug, Deserialize, Validate)]
pub struct ContactRequest {
    #[validate(custom = "not_blank")]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(custom = "not_blank")]
    pub msg: String,
}

impl From<ContactRequest> for Inquiry {
    fn from(form: ContactRequest) -> Self {
        Inquiry {
            id: String::new(),
            name: form.name.trim().to_string(),
            email: form.email.trim().to_string(),
            msg: form.msg,
            date: String::new(),
        }
    }
}

/// Site-wide settings, stored as a singleton.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SiteConfig {
    pub phone: String,
    pub whatsapp: String,
    #[serde(default)]
    pub logo: String,
    pub address: Localized,
    pub hero_title: Localized,
    pub hero_sub: Localized,
    #[serde(default)]
    pub hero_image: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct DashboardStats {
    pub products: usize,
    pub articles: usize,
    pub inquiries: usize,
    pub gallery: usize,
    pub reviews: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn product(name_ar: &str, name_en: &str, category: &str) -> Product {
        Product {
            id: "p".into(),
            name: Localized { ar: name_ar.into(), en: name_en.into() },
            description: Localized::default(),
            images: vec![],
            category: category.into(),
            price: None,
        }
    }

    #[test]
    fn site_config_uses_camel_case_fields() {
        let value = json!({
            "phone": "1", "whatsapp": "2", "logo": "",
            "address": { "ar": "دمياط", "en": "Damietta" },
            "heroTitle": { "ar": "عنوان", "en": "Title" },
            "heroSub": { "ar": "فرعي", "en": "Sub" },
            "heroImage": "hero.jpg"
        });
        let config: SiteConfig = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(config.hero_title.en, "Title");
        assert_eq!(serde_json::to_value(&config).unwrap(), value);
    }

    #[test]
    fn new_product_copies_arabic_into_empty_english() {
        let mut item = product("فحم", "", "Premium");
        item.fill_defaults();
        assert_eq!(item.name.en, "فحم");
    }

    #[test]
    fn fill_defaults_keeps_values_already_set() {
        let mut article = Article {
            id: "a".into(),
            title: Localized { ar: "عنوان".into(), en: "Title".into() },
            content: Localized { ar: "نص".into(), en: String::new() },
            image: String::new(),
            date: "2023-10-01".into(),
        };
        article.fill_defaults();
        assert_eq!(article.title.en, "Title");
        assert_eq!(article.content.en, "نص");
        assert_eq!(article.date, "2023-10-01");
    }

    #[test]
    fn review_rating_is_bounded() {
        let mut review = Review {
            id: "1".into(),
            author: "Ahmed".into(),
            rating: 6,
            comment: Localized::default(),
            avatar: String::new(),
        };
        assert!(review.validate().is_err());
        review.rating = 5;
        assert!(review.validate().is_ok());
    }

    #[test]
    fn product_requires_arabic_name() {
        assert!(product("", "Charcoal", "Premium").validate().is_err());
        assert!(product("فحم", "", "Premium").validate().is_ok());
    }

    #[test]
    fn gallery_category_rejects_unknown_tag() {
        let bad = json!({ "id": "1", "url": "x.jpg", "category": "office" });
        assert!(serde_json::from_value::<GalleryItem>(bad).is_err());
    }

    #[test]
    fn product_filter_checks_category_and_text() {
        let item = product("فحم طلح", "Talh Charcoal", "Premium");
        let query = ListQuery {
            q: Some("talh".into()),
            category: Some("premium".into()),
            lang: Some(Lang::En),
        };
        assert!(item.matches(&query));

        let other_category = ListQuery { category: Some("Citrus".into()), ..Default::default() };
        assert!(!item.matches(&other_category));

        let arabic_default = ListQuery { q: Some("talh".into()), ..Default::default() };
        assert!(!item.matches(&arabic_default));
    }

    #[test]
    fn contact_request_checks_email() {
        let form = ContactRequest {
            name: "Mona".into(),
            email: "not-an-email".into(),
            msg: "hello".into(),
        };
        assert!(form.validate().is_err());
    }

    #[test]
    fn contact_request_rejects_whitespace_only_text() {
        let form = ContactRequest {
            name: "   ".into(),
            email: "mona@example.com".into(),
            msg: "\n\t".into(),
        };
        let errors = form.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("msg"));
        assert!(!fields.contains_key("email"));
    }
}
