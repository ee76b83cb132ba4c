use anyhow::Result;

use hyperopt_runner::time_util::{duration_to_minutes, utc_now_display};

#[tokio::test]
async fn test_duration_to_minutes() -> Result<()> {
    // H:MM:SS
    assert_eq!(duration_to_minutes("4:01:00"), Some(241));
    assert_eq!(duration_to_minutes("0:45:30"), Some(46));
    assert_eq!(duration_to_minutes("0:00:29"), Some(0));
    // 半分钟向偶数取整
    assert_eq!(duration_to_minutes("0:00:30"), Some(0));
    assert_eq!(duration_to_minutes("0:01:30"), Some(2));
    assert_eq!(duration_to_minutes("0:02:30"), Some(2));
    // MM:SS
    assert_eq!(duration_to_minutes("45:30"), Some(46));
    assert_eq!(duration_to_minutes(" 12:00 "), Some(12));
    // 不合法输入
    assert_eq!(duration_to_minutes("abc"), None);
    assert_eq!(duration_to_minutes("1:2:3:4"), None);
    assert_eq!(duration_to_minutes(""), None);
    println!("持续时间换算测试通过-------");
    Ok(())
}

#[tokio::test]
async fn test_utc_now_display_format() -> Result<()> {
    let now = utc_now_display();
    println!("now: {}", now);
    assert!(now.ends_with(" UTC"));
    // 形如 2025-06-01 10:00:00 UTC
    assert_eq!(now.len(), "2025-06-01 10:00:00 UTC".len());
    Ok(())
}
