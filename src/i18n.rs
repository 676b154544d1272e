//! Static translation catalog for the tracking vocabulary.
//!
//! Lookup falls back from the selected locale to English and finally to the
//! raw key, so a missing translation degrades to something readable instead
//! of failing.

use std::collections::HashMap;

use lazy_static::lazy_static;

use crate::order::OrderStatus;

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    En,
    Ar,
}

impl Locale {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Ar => "ar",
        }
    }

    /// Arabic renders right-to-left.
    pub const fn is_rtl(self) -> bool {
        matches!(self, Self::Ar)
    }
}

lazy_static! {
    static ref EN: HashMap<&'static str, &'static str> = HashMap::from([
        ("track_your_order", "Track Your Order"),
        ("track_order_desc", "Enter your order number to see real-time delivery status"),
        ("loading_tracking", "Loading order details..."),
        ("no_order_found", "No Order Found"),
        ("no_order_msg", "Please enter a valid order number to track your delivery."),
        ("order_status_title", "Order Status"),
        ("live_status", "Live"),
        ("current_status_label", "Current Status"),
        ("live_tracking", "Live Tracking"),
        ("no_pilot", "No pilot assigned"),
        ("no_phone", "No phone available"),
        ("waiting_assignment", "Waiting for assignment..."),
        ("location_updates", "Location updates will appear here"),
        ("last_update", "Last update"),
        ("order_not_found_error", "Order not found. Please check the order number."),
        ("estimated_arrival", "Estimated arrival"),
        ("distance_label", "Distance"),
        ("delivery_destination", "Delivery Destination"),
        ("order_number", "Order Number"),
        ("total", "Total"),
        ("status_placed", "Order Placed"),
        ("status_confirmed", "Confirmed"),
        ("status_packed", "Packed"),
        ("status_processing", "Processing"),
        ("status_handed_over", "Handed to Pilot"),
        ("status_out_for_delivery", "Out for Delivery"),
        ("status_delivered", "Delivered"),
        ("status_cancelled", "Cancelled"),
    ]);

    static ref AR: HashMap<&'static str, &'static str> = HashMap::from([
        ("track_your_order", "تتبع طلبك"),
        ("track_order_desc", "أدخل رقم الطلب لمعرفة حالة التوصيل في الوقت الفعلي"),
        ("loading_tracking", "جاري تحميل تفاصيل الطلب..."),
        ("no_order_found", "لم يتم العثور على طلب"),
        ("no_order_msg", "يرجى إدخال رقم طلب صحيح لتتبع شحنتك."),
        ("order_status_title", "حالة الطلب"),
        ("live_status", "مباشر"),
        ("current_status_label", "الحالة الحالية"),
        ("live_tracking", "تتبع مباشر"),
        ("no_pilot", "لم يتم تعيين سائق"),
        ("no_phone", "لا يوجد رقم هاتف"),
        ("waiting_assignment", "بانتظار التعيين..."),
        ("location_updates", "ستظهر تحديثات الموقع هنا"),
        ("last_update", "آخر تحديث"),
        ("order_not_found_error", "الطلب غير موجود. يرجى التحقق من رقم الطلب."),
        ("estimated_arrival", "الوصول المتوقع"),
        ("distance_label", "المسافة"),
        ("delivery_destination", "وجهة التوصيل"),
        ("order_number", "رقم الطلب"),
        ("total", "المجموع"),
        ("status_placed", "تم الطلب"),
        ("status_confirmed", "تم التأكيد"),
        ("status_packed", "تم التجهيز"),
        ("status_processing", "جاري المعالجة"),
        ("status_handed_over", "تم التسليم للسائق"),
        ("status_out_for_delivery", "خرج للتوصيل"),
        ("status_delivered", "تم التوصيل"),
        ("status_cancelled", "ملغي"),
    ]);
}

/// Resolve a catalog key for the given locale. Falls back to English, then to
/// the key itself.
pub fn translate<'a>(locale: Locale, key: &'a str) -> &'a str {
    let catalog = match locale {
        Locale::En => &*EN,
        Locale::Ar => &*AR,
    };

    catalog
        .get(key)
        .or_else(|| EN.get(key))
        .copied()
        .unwrap_or(key)
}

/// Localized display name for an order status. Unrecognized statuses show
/// their raw wire value.
pub fn status_label(locale: Locale, status: &OrderStatus) -> String {
    match status.translation_key() {
        Some(key) => translate(locale, key).to_string(),
        None => status.as_str().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_uses_selected_locale() {
        assert_eq!(translate(Locale::En, "last_update"), "Last update");
        assert_eq!(translate(Locale::Ar, "last_update"), "آخر تحديث");
    }

    #[test]
    fn test_translate_falls_back_to_english_then_key() {
        // A key missing everywhere resolves to itself.
        assert_eq!(translate(Locale::Ar, "missing_key"), "missing_key");
        assert_eq!(translate(Locale::En, "missing_key"), "missing_key");
    }

    #[test]
    fn test_every_status_has_a_label_in_both_locales() {
        let mut statuses: Vec<OrderStatus> = OrderStatus::STAGES.to_vec();
        statuses.push(OrderStatus::Cancelled);

        for status in statuses {
            let key = status.translation_key().unwrap();
            assert_ne!(translate(Locale::En, key), key, "missing en: {key}");
            assert_ne!(translate(Locale::Ar, key), key, "missing ar: {key}");
        }
    }

    #[test]
    fn test_status_label_for_known_and_unknown() {
        assert_eq!(status_label(Locale::En, &OrderStatus::Pending), "Order Placed");
        assert_eq!(
            status_label(Locale::Ar, &OrderStatus::HandedOver),
            "تم التسليم للسائق"
        );
        assert_eq!(
            status_label(Locale::En, &OrderStatus::Other("on_the_way".to_string())),
            "on_the_way"
        );
    }

    #[test]
    fn test_locale_metadata() {
        assert_eq!(Locale::En.as_str(), "en");
        assert_eq!(Locale::Ar.as_str(), "ar");
        assert!(Locale::Ar.is_rtl());
        assert!(!Locale::En.is_rtl());
    }
}
