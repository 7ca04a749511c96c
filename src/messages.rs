//! Bilingual (English + Hindi) WhatsApp message bodies.

use crate::config::AppConfig;
use time::OffsetDateTime;

fn header(config: &AppConfig) -> String {
    format!("🌾 {} | {}", config.store_name, config.store_name_hindi)
}

/// One snapshotted line item, as shown in a confirmation message.
pub struct ItemLine {
    pub name: String,
    pub quantity: i32,
}

pub fn purchase_confirmation(
    config: &AppConfig,
    sn: &str,
    items: &[ItemLine],
    total: f64,
    deposit: f64,
    remaining: f64,
) -> String {
    let mut message = format!(
        "{}\n\nPurchase Confirmation | खरीद पुष्टि\nSN: {}\n",
        header(config),
        sn
    );

    if !items.is_empty() {
        message.push_str("\nProducts | उत्पाद:\n");
        for item in items {
            message.push_str(&format!("- {} (×{})\n", item.name, item.quantity));
        }
    }

    message.push_str(&format!(
        "\nTotal Amount | कुल राशि: ₹{}\nDeposit Amount | जमा राशि: ₹{}\nRemaining Amount | शेष राशि: ₹{}\n\nCheck details online | ऑनलाइन विवरण देखें:\n{}",
        total, deposit, remaining, config.site_url
    ));
    message
}

pub fn payment_update(
    config: &AppConfig,
    sn: &str,
    status: &str,
    previous_deposit: f64,
    increment: f64,
    total_deposit: f64,
    remaining: f64,
) -> String {
    let closing = if remaining <= 0.0 {
        "🎉 Payment Completed! | भुगतान पूरा हुआ!"
    } else {
        "Please clear your remaining payment. | कृपया शेष भुगतान करें।"
    };
    format!(
        "{}\n\nPayment Update | भुगतान अपडेट\nSN: {}\n\nStatus | स्थिति: {}\nPrevious Deposit | पिछला जमा: ₹{}\nNew Deposit | नया जमा: ₹{}\nTotal Deposit | कुल जमा: ₹{}\nRemaining Amount | शेष राशि: ₹{}\n\n{}\n\nCheck details online | ऑनलाइन विवरण देखें:\n{}",
        header(config),
        sn,
        status,
        previous_deposit,
        increment,
        total_deposit,
        remaining,
        closing,
        config.site_url
    )
}

pub fn password_reset(config: &AppConfig, code: &str) -> String {
    format!(
        "{}\n\nPassword Reset | पासवर्ड रीसेट\n\nYour password reset code | आपका पासवर्ड रीसेट कोड: {}\n\nThis code will expire in 1 hour | यह कोड 1 घंटे में समाप्त हो जाएगा\n\nReset your password at | अपना पासवर्ड यहां रीसेट करें:\n{}/reset-password\n\nIf you didn't request this, please ignore this message.\nयदि आपने यह अनुरोध नहीं किया है, तो कृपया इस संदेश को अनदेखा करें।",
        header(config),
        code,
        config.site_url
    )
}

pub fn password_reset_done(config: &AppConfig) -> String {
    format!(
        "{}\n\nPassword Updated | पासवर्ड अपडेट किया गया\n\nYour password has been successfully updated.\nआपका पासवर्ड सफलतापूर्वक अपडेट कर दिया गया है।\n\nYou can now login with your new password.\nअब आप अपने नए पासवर्ड से लॉगिन कर सकते हैं।",
        header(config)
    )
}

pub fn announcement(config: &AppConfig, english: &str, hindi: Option<&str>) -> String {
    format!(
        "{}\n\n📢 Announcement | घोषणा\n\nEnglish:\n{}\n\nहिंदी:\n{}\n\nVisit us | हमसे मिलें:\n{}",
        header(config),
        english,
        hindi.unwrap_or(english),
        config.site_url
    )
}

/// One outstanding purchase in a consolidated reminder.
pub struct ReminderLine {
    pub purchased_at: OffsetDateTime,
    pub remaining_amount: f64,
}

pub fn payment_reminder(config: &AppConfig, lines: &[ReminderLine]) -> String {
    let mut message = format!(
        "{}\n\n🔔 Payment Reminder | भुगतान अनुस्मारक\n\nहिंदी:\nप्रिय ग्राहक,\nआपके पास निम्नलिखित खरीद के लिए भुगतान बकाया है:\n\n",
        header(config)
    );
    for line in lines {
        message.push_str(&format!(
            "खरीद दिनांक: {}\nशेष राशि: ₹{}\n\n",
            line.purchased_at.date(),
            line.remaining_amount
        ));
    }
    message.push_str(&format!(
        "कृपया अपना बकाया भुगतान करें।\nविवरण देखें: {}\n\nEnglish:\nDear Customer,\nYou have pending payments for the following purchases:\n\n",
        config.site_url
    ));
    for line in lines {
        message.push_str(&format!(
            "Purchase Date: {}\nRemaining Amount: ₹{}\n\n",
            line.purchased_at.date(),
            line.remaining_amount
        ));
    }
    message.push_str(&format!(
        "Please clear your pending payments.\nCheck details at: {}",
        config.site_url
    ));
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;
    use time::macros::datetime;

    #[tokio::test]
    async fn confirmation_lists_items_and_amounts() {
        let state = AppState::fake();
        let items = vec![
            ItemLine {
                name: "Wheat Seed".into(),
                quantity: 2,
            },
            ItemLine {
                name: "Urea".into(),
                quantity: 1,
            },
        ];
        let body = purchase_confirmation(&state.config, "SN-42", &items, 1500.0, 500.0, 1000.0);
        assert!(body.contains("SN: SN-42"));
        assert!(body.contains("- Wheat Seed (×2)"));
        assert!(body.contains("- Urea (×1)"));
        assert!(body.contains("₹1500"));
        assert!(body.contains("₹500"));
        assert!(body.contains("₹1000"));
        assert!(body.contains("खरीद पुष्टि"));
    }

    #[tokio::test]
    async fn confirmation_without_items_has_no_product_section() {
        let state = AppState::fake();
        let body = purchase_confirmation(&state.config, "SN-1", &[], 800.0, 0.0, 800.0);
        assert!(!body.contains("Products"));
        assert!(body.contains("₹800"));
    }

    #[tokio::test]
    async fn payment_update_celebrates_completion() {
        let state = AppState::fake();
        let done = payment_update(&state.config, "SN-7", "completed", 500.0, 500.0, 1000.0, 0.0);
        assert!(done.contains("Payment Completed"));

        let open = payment_update(&state.config, "SN-7", "pending", 0.0, 500.0, 500.0, 500.0);
        assert!(open.contains("Please clear your remaining payment"));
    }

    #[tokio::test]
    async fn reset_message_carries_the_code() {
        let state = AppState::fake();
        let body = password_reset(&state.config, "A1B2C3");
        assert!(body.contains("A1B2C3"));
        assert!(body.contains("/reset-password"));
    }

    #[tokio::test]
    async fn announcement_falls_back_to_english() {
        let state = AppState::fake();
        let body = announcement(&state.config, "Store closed Sunday", None);
        assert_eq!(body.matches("Store closed Sunday").count(), 2);

        let body = announcement(&state.config, "Hello", Some("नमस्ते"));
        assert!(body.contains("नमस्ते"));
    }

    #[tokio::test]
    async fn reminder_lists_every_outstanding_purchase() {
        let state = AppState::fake();
        let lines = vec![
            ReminderLine {
                purchased_at: datetime!(2024-01-15 10:00 UTC),
                remaining_amount: 300.0,
            },
            ReminderLine {
                purchased_at: datetime!(2024-02-20 10:00 UTC),
                remaining_amount: 450.0,
            },
        ];
        let body = payment_reminder(&state.config, &lines);
        // each purchase appears in both language sections
        assert_eq!(body.matches("2024-01-15").count(), 2);
        assert_eq!(body.matches("2024-02-20").count(), 2);
        assert_eq!(body.matches("₹300").count(), 2);
        assert_eq!(body.matches("₹450").count(), 2);
    }
}
