//! Small, concrete artefacts Lucy hands a customer while coaching: a ready-to-send promo or
//! an expense tracker, and instant business tips.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

const TRAFFIC_WORDS: &[&str] = &["customers", "traffic"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    WhatsAppPromo,
    ExpenseTracker,
}

impl AssetKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::WhatsAppPromo => "WhatsApp Promo",
            Self::ExpenseTracker => "Expense Tracker",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoachingAsset {
    pub kind: AssetKind,
    pub body: String,
}

/// Builds a promo when the challenge is about footfall, otherwise a weekly expense tracker.
pub fn create_asset(challenge: &str, business_type: &str) -> CoachingAsset {
    let lowered = challenge.to_lowercase();
    if TRAFFIC_WORDS.iter().any(|word| lowered.contains(word)) {
        let business = match business_type.trim() {
            "" => "Business",
            named => named,
        };
        CoachingAsset {
            kind: AssetKind::WhatsAppPromo,
            body: format!(
                "*Boost Your {business} Today!*\n\
                 Visit [Your Business Name] at [Location]\n\
                 - Fresh quality products daily\n\
                 - Fair prices, friendly service\n\
                 Show this message = 5% discount!\n\
                 Valid until [Date]. Come see what's new!"
            ),
        }
    } else {
        let days = ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday"];
        let mut body = String::from("Weekly Expense Tracker\n");
        for day in days {
            body.push_str(day);
            body.push_str(": Stock___ Rent___ Transport___ Other___\n");
        }
        body.push_str("Total Week: _____ KES");
        CoachingAsset { kind: AssetKind::ExpenseTracker, body }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct BusinessTip {
    pub tip: &'static str,
    pub follow_up: &'static str,
}

pub const BUSINESS_TIPS: [BusinessTip; 3] = [
    BusinessTip {
        tip: "Ask your regular customers what other products they wish you had. Small requests \
              can turn into big sales if you listen and act fast.",
        follow_up: "Would you like another tip, or do you want to try tracking your daily \
                    sales (2) or planning for new products (3)?",
    },
    BusinessTip {
        tip: "Keep track of your best-selling hours. Notice when most customers come, then make \
              sure you're fully stocked during those peak times.",
        follow_up: "Want more tips? Reply (1) for more tips, (2) to track daily sales, or (3) for \
                    product planning advice!",
    },
    BusinessTip {
        tip: "Create a simple loyalty system: every 10th purchase gets a small discount. Word \
              spreads fast about good deals.",
        follow_up: "What would help you most? (1) Another tip, (2) Sales tracking, or (3) Product \
                    planning? Just send the number!",
    },
];

pub fn business_tip<R>(rng: &mut R) -> BusinessTip
where
    R: Rng + ?Sized,
{
    BUSINESS_TIPS.choose(rng).copied().unwrap_or(BUSINESS_TIPS[0])
}

impl BusinessTip {
    pub fn render(&self) -> String {
        format!(
            "Here's a quick business tip to help increase your sales:\n\n{}\n\n{}",
            self.tip, self.follow_up
        )
    }
}
