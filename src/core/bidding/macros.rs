/// Values available to click url placeholders. Names that did not
/// resolve against the code tables are passed as empty strings.
#[derive(Debug, Clone, Default)]
pub struct ClickMacros<'a> {
    pub click_id: &'a str,
    pub tracking_token: &'a str,
    pub auction_id: u64,
    pub network: &'a str,
    pub sub_network: &'a str,
    pub brand: &'a str,
    pub brand_slug: &'a str,
    pub vertical: &'a str,
    pub placement: &'a str,
    /// Full price in micro units, rendered as `{cpc}`
    pub full_price: i64,
}

/// Expand every placeholder in a creative redirect template.
/// `{realnetwork}` and `{realsubnetwork}` are always blanked.
pub fn fill_click_macros(template: &str, macros: &ClickMacros) -> String {
    let cpc = format!("{:.6}", macros.full_price as f64 / 100_000.0);

    template
        .replace("{realnetwork}", "")
        .replace("{realsubnetwork}", "")
        .replace("{clickid}", macros.click_id)
        .replace("{ct}", macros.tracking_token)
        .replace("{auctionid}", &macros.auction_id.to_string())
        .replace("{network}", macros.network)
        .replace("{subnetwork}", macros.sub_network)
        .replace("{brandurl}", macros.brand_slug)
        .replace("{brand}", macros.brand)
        .replace("{vertical}", macros.vertical)
        .replace("{cpc}", &cpc)
        .replace("{placement}", macros.placement)
}

/// Win notice url with exchange side auction macros left for the
/// exchange to fill
pub fn win_notice_url(domain: &str, win_path: &str) -> String {
    format!(
        "http://{}{}?price=${{AUCTION_PRICE}}&key=${{AUCTION_BID_ID}}&imp=${{AUCTION_IMP_ID}}",
        domain, win_path
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fills_all_placeholders() {
        let template = "http://lander.test/go?c={clickid}&t={ct}&a={auctionid}&n={network}\
                        &sn={subnetwork}&b={brand}&bu={brandurl}&v={vertical}&p={cpc}\
                        &pl={placement}&rn={realnetwork}&rsn={realsubnetwork}";

        let macros = ClickMacros {
            click_id: "tok-en.",
            tracking_token: "trk",
            auction_id: 77,
            network: "netA",
            sub_network: "",
            brand: "Acme",
            brand_slug: "acme-co",
            vertical: "auto",
            placement: "top",
            full_price: 100,
        };

        assert_eq!(
            fill_click_macros(template, &macros),
            "http://lander.test/go?c=tok-en.&t=trk&a=77&n=netA&sn=&b=Acme&bu=acme-co&v=auto\
             &p=0.001000&pl=top&rn=&rsn="
        );
    }

    #[test]
    fn test_repeated_placeholders_all_replaced() {
        let macros = ClickMacros {
            click_id: "x",
            ..Default::default()
        };

        assert_eq!(fill_click_macros("{clickid}/{clickid}", &macros), "x/x");
    }

    #[test]
    fn test_win_notice_url_keeps_exchange_macros() {
        assert_eq!(
            win_notice_url("events.test", "/win"),
            "http://events.test/win?price=${AUCTION_PRICE}&key=${AUCTION_BID_ID}&imp=${AUCTION_IMP_ID}"
        );
    }
}
