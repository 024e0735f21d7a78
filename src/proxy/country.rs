//! Country code to display name table

use once_cell::sync::Lazy;
use std::collections::HashMap;

static COUNTRY_NAMES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("AD", "安道尔"),
        ("AE", "阿联酋"),
        ("AF", "阿富汗"),
        ("AG", "安提瓜和巴布达"),
        ("AL", "阿尔巴尼亚"),
        ("AM", "亚美尼亚"),
        ("AR", "阿根廷"),
        ("AT", "奥地利"),
        ("AU", "澳大利亚"),
        ("AZ", "阿塞拜疆"),
        ("BA", "波黑"),
        ("BD", "孟加拉国"),
        ("BE", "比利时"),
        ("BG", "保加利亚"),
        ("BH", "巴林"),
        ("BR", "巴西"),
        ("BY", "白俄罗斯"),
        ("CA", "加拿大"),
        ("CH", "瑞士"),
        ("CL", "智利"),
        ("CN", "中国"),
        ("CO", "哥伦比亚"),
        ("CR", "哥斯达黎加"),
        ("CZ", "捷克"),
        ("DE", "德国"),
        ("DK", "丹麦"),
        ("DO", "多米尼加"),
        ("DZ", "阿尔及利亚"),
        ("EC", "厄瓜多尔"),
        ("EE", "爱沙尼亚"),
        ("EG", "埃及"),
        ("ES", "西班牙"),
        ("FI", "芬兰"),
        ("FR", "法国"),
        ("GB", "英国"),
        ("GR", "希腊"),
        ("HK", "香港"),
        ("HR", "克罗地亚"),
        ("HU", "匈牙利"),
        ("ID", "印度尼西亚"),
        ("IE", "爱尔兰"),
        ("IL", "以色列"),
        ("IN", "印度"),
        ("IQ", "伊拉克"),
        ("IR", "伊朗"),
        ("IS", "冰岛"),
        ("IT", "意大利"),
        ("JP", "日本"),
        ("KE", "肯尼亚"),
        ("KR", "韩国"),
        ("KZ", "哈萨克斯坦"),
        ("LB", "黎巴嫩"),
        ("LT", "立陶宛"),
        ("LU", "卢森堡"),
        ("LV", "拉脱维亚"),
        ("MA", "摩洛哥"),
        ("MD", "摩尔多瓦"),
        ("MX", "墨西哥"),
        ("MY", "马来西亚"),
        ("NG", "尼日利亚"),
        ("NL", "荷兰"),
        ("NO", "挪威"),
        ("NZ", "新西兰"),
        ("PE", "秘鲁"),
        ("PH", "菲律宾"),
        ("PK", "巴基斯坦"),
        ("PL", "波兰"),
        ("PT", "葡萄牙"),
        ("RO", "罗马尼亚"),
        ("RS", "塞尔维亚"),
        ("RU", "俄罗斯"),
        ("SA", "沙特阿拉伯"),
        ("SE", "瑞典"),
        ("SG", "新加坡"),
        ("SI", "斯洛文尼亚"),
        ("SK", "斯洛伐克"),
        ("TH", "泰国"),
        ("TR", "土耳其"),
        ("TW", "台湾"),
        ("UA", "乌克兰"),
        ("US", "美国"),
        ("UY", "乌拉圭"),
        ("VE", "委内瑞拉"),
        ("VN", "越南"),
        ("ZA", "南非"),
    ]
    .into_iter()
    .collect()
});

/// Look up the display name for an uppercase country code
pub fn country_name(code: &str) -> Option<&'static str> {
    COUNTRY_NAMES.get(code).copied()
}

/// Display name for a code in any case; unmapped codes come back as given
pub fn display_name(code: &str) -> String {
    country_name(&code.to_uppercase()).map_or_else(|| code.to_string(), str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        assert_eq!(country_name("US"), Some("美国"));
        assert_eq!(country_name("JP"), Some("日本"));
        assert_eq!(display_name("SG"), "新加坡");
    }

    #[test]
    fn test_unmapped_code_passes_through() {
        assert_eq!(country_name("XX"), None);
        assert_eq!(display_name("XX"), "XX");
        assert_eq!(display_name(""), "");
    }

    #[test]
    fn test_display_name_ignores_case_but_keeps_raw_fallback() {
        assert_eq!(display_name("sg"), "新加坡");
        assert_eq!(display_name("zz"), "zz");
    }
}
