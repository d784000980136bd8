use std::io::{self, BufRead, Write};

/// 打印提示并读取一行输入（已去除首尾空白）。输入结束时返回 `UnexpectedEof`。
pub fn prompt(message: &str) -> io::Result<String> {
    print!("{}", message);
    io::stdout().flush()?;
    read_answer(&mut io::stdin().lock())
}

pub fn confirm(message: &str) -> io::Result<bool> {
    let answer = prompt(message)?;
    Ok(is_yes(&answer))
}

/// 读取一行；读到 0 字节说明输入已关闭，空行则返回空字符串
pub fn read_answer<R: BufRead>(reader: &mut R) -> io::Result<String> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "输入已结束"));
    }
    Ok(line.trim().to_string())
}

pub fn is_end_of_input(error: &io::Error) -> bool {
    error.kind() == io::ErrorKind::UnexpectedEof
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y"));
        assert!(is_yes(" Yes "));
        assert!(!is_yes(""));
        assert!(!is_yes("n"));
    }

    #[test]
    fn test_read_answer_lines_then_eof() {
        let mut input = Cursor::new("  https://weebcentral.com/series/X  \n\n");
        assert_eq!(read_answer(&mut input).unwrap(), "https://weebcentral.com/series/X");
        assert_eq!(read_answer(&mut input).unwrap(), "");

        let err = read_answer(&mut input).unwrap_err();
        assert!(is_end_of_input(&err));
    }

    #[test]
    fn test_read_answer_last_line_without_newline() {
        let mut input = Cursor::new("all");
        assert_eq!(read_answer(&mut input).unwrap(), "all");
        assert!(is_end_of_input(&read_answer(&mut input).unwrap_err()));
    }
}
