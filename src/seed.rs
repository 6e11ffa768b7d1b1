//! Catalogue written into empty stores on first start.

use serde_json::{json, Value};

use crate::store::CollectionKind;

pub fn collection(kind: CollectionKind) -> Vec<Value> {
    match kind {
        CollectionKind::Products => vec![
            json!({
                "id": "1",
                "name": { "ar": "فحم طلح سوداني نخب أول", "en": "Premium Sudanese Talh Charcoal" },
                "description": {
                    "ar": "فحم طبيعي 100% مستخرج من غابات السودان. يتميز بصوت رنين معدني وقوة حرارة جبارة تدوم لأكثر من 5 ساعات متواصلة. خالي من الأتربة والشوائب تماماً.",
                    "en": "100% natural charcoal from Sudan forests. Characterized by a metallic ring and immense heat power lasting over 5 hours."
                },
                "images": [
                    "https://images.unsplash.com/photo-1599619351208-3e6c839d6828?q=80&w=2072&auto=format&fit=crop",
                    "https://images.unsplash.com/photo-1541810270-3601557ba8d6?q=80&w=2070&auto=format&fit=crop",
                    "https://images.unsplash.com/photo-1521618755572-156ae0cdd74d?q=80&w=2076&auto=format&fit=crop"
                ],
                "category": "Premium"
            }),
            json!({
                "id": "2",
                "name": { "ar": "فحم حمضيات (برتقال وليمون)", "en": "Citrus Charcoal (Orange & Lemon)" },
                "description": {
                    "ar": "فحم مثالي للمشويات والأرجيلة، يتميز برماد أبيض ناصع جداً واشتعال سريع بدون شرر أو أدخنة كثيفة.",
                    "en": "Ideal for grilling and shisha, featuring very white ash and fast ignition without sparks."
                },
                "images": [
                    "https://images.unsplash.com/photo-1521618755572-156ae0cdd74d?q=80&w=2076&auto=format&fit=crop",
                    "https://images.unsplash.com/photo-1591261730799-ee4e6c2d16d7?q=80&w=2070&auto=format&fit=crop"
                ],
                "category": "Citrus"
            }),
        ],
        CollectionKind::Articles => vec![json!({
            "id": "1",
            "title": { "ar": "أسرار صناعة الفحم في دمياط", "en": "Secrets of Charcoal Industry in Damietta" },
            "content": {
                "ar": "تعتبر المنطقة الصناعية بدمياط الجديدة قلعة لصناعة الفحم في مصر. نعتمد على أفران حديثة صديقة للبيئة تضمن جودة الكربون ونقائه من الشوائب.",
                "en": "The industrial zone in New Damietta is a stronghold for the charcoal industry. We use modern eco-friendly kilns that ensure carbon quality and purity."
            },
            "image": "https://images.unsplash.com/photo-1555939594-58d7cb561ad1?q=80&w=1974&auto=format&fit=crop",
            "date": "2024-07-10"
        })],
        CollectionKind::Reviews => vec![json!({
            "id": "1",
            "author": "أحمد بدير",
            "rating": 5,
            "comment": {
                "ar": "فحم ممتاز وسعره مناسب جداً، تعامل راقي وسرعة في التوصيل.",
                "en": "Excellent charcoal, great price, and professional service."
            },
            "avatar": "https://i.pravatar.cc/150?u=a"
        })],
        CollectionKind::Gallery | CollectionKind::Inquiries => Vec::new(),
    }
}

pub fn settings() -> Value {
    json!({
        "phone": "01000187892",
        "whatsapp": "201000187892",
        "logo": "https://images.unsplash.com/photo-1599619351208-3e6c839d6828?q=80&w=100&auto=format&fit=crop",
        "address": {
            "ar": "دمياط الجديدة، المنطقة الصناعية - مصنع فحم العاصمة",
            "en": "New Damietta, Industrial Area - Capital Charcoal Factory"
        },
        "heroTitle": {
            "ar": "فحم العاصمة - التميز في كل شروة",
            "en": "Capital Charcoal - Excellence in Every Batch"
        },
        "heroSub": {
            "ar": "المصدر الأول في مصر لأجود أنواع الفحم النباتي والمضغوط. نضمن لك حرارة تدوم طويلاً ونقاءً لا يضاهى.",
            "en": "The primary source in Egypt for the finest natural and compressed charcoal. We guarantee long-lasting heat and unmatched purity."
        },
        "heroImage": "https://images.unsplash.com/photo-1541810270-3601557ba8d6?q=80&w=2070&auto=format&fit=crop"
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Article, Product, Review, SiteConfig};

    #[test]
    fn seed_data_matches_the_record_types() {
        let products: Vec<Product> =
            serde_json::from_value(Value::Array(collection(CollectionKind::Products))).unwrap();
        assert_eq!(products.len(), 2);
        assert!(products.iter().all(|p| p.price.is_none()));

        let _: Vec<Article> =
            serde_json::from_value(Value::Array(collection(CollectionKind::Articles))).unwrap();
        let _: Vec<Review> =
            serde_json::from_value(Value::Array(collection(CollectionKind::Reviews))).unwrap();
        let config: SiteConfig = serde_json::from_value(settings()).unwrap();
        assert_eq!(config.whatsapp, "201000187892");
    }
}
