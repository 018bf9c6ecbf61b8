use lazy_static::lazy_static;
use serde::Serialize;
use std::collections::HashMap;

lazy_static! {
    /// App Store ids for products whose store page is known.
    static ref KNOWN_APP_IDS: HashMap<&'static str, &'static str> = HashMap::from([
        ("ChatGPT", "6447795913"),
        ("Claude", "1648466641"),
        ("微信", "414478124"),
        ("WeChat", "414478124"),
        ("QQ", "444934666"),
        ("支付宝", "333206289"),
        ("Alipay", "333206289"),
        ("淘宝", "387682726"),
        ("Taobao", "387682726"),
        ("京东", "414245413"),
        ("JD", "414245413"),
        ("抖音", "1142110895"),
        ("TikTok", "835599320"),
        ("快手", "440948110"),
        ("Duolingo", "570060128"),
        ("Canva", "897446215"),
        ("FaceApp", "1180884341"),
        ("Facetune", "606310581"),
        ("美图秀秀", "416048305"),
        ("Picsart", "587366035"),
        ("Lightroom", "878783582"),
        ("夸克", "1160172628"),
        ("Remini", "1470373330"),
    ]);
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreLink {
    pub url: String,
    /// True when `url` is the product page rather than a search.
    pub is_direct_link: bool,
}

/// App Store page for a product, falling back to a store search.
pub fn app_store_link(product: &str) -> StoreLink {
    match KNOWN_APP_IDS.get(product) {
        Some(id) => StoreLink {
            url: format!("https://apps.apple.com/app/id{}", id),
            is_direct_link: true,
        },
        None => StoreLink {
            url: format!(
                "https://apps.apple.com/cn/search?term={}",
                urlencoding::encode(product)
            ),
            is_direct_link: false,
        },
    }
}
