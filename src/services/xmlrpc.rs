//! 最小化的 XML-RPC 编解码，只覆盖 supervisord 用到的部分
//!
//! 响应被解码为 `serde_json::Value`，再交给 serde 映射到具体结构体。

use quick_xml::events::Event;
use quick_xml::Reader;
use serde_json::{Map, Number, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum XmlRpcError {
    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("unexpected XML-RPC structure: {0}")]
    Malformed(String),

    #[error("XML-RPC fault {code}: {message}")]
    Fault { code: i64, message: String },
}

/// 构造无参数的 methodCall 请求体
pub fn encode_call(method: &str) -> String {
    format!(
        "<?xml version=\"1.0\"?>\n<methodCall><methodName>{}</methodName><params></params></methodCall>",
        escape(method)
    )
}

fn escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// 解析 methodResponse，返回唯一的返回值；fault 响应转为 [`XmlRpcError::Fault`]
pub fn decode_response(body: &str) -> Result<Value, XmlRpcError> {
    let mut parser = Parser::new(tokenize(body)?);

    parser.expect_start("methodResponse")?;
    parser.skip_whitespace();

    let result = match parser.next_token() {
        Some(Token::Start(tag)) if tag == "params" => {
            parser.skip_whitespace();
            parser.expect_start("param")?;
            parser.skip_whitespace();
            let value = parser.parse_value()?;
            parser.skip_whitespace();
            parser.expect_end("param")?;
            parser.skip_whitespace();
            parser.expect_end("params")?;
            Ok(value)
        }
        Some(Token::Start(tag)) if tag == "fault" => {
            parser.skip_whitespace();
            let fault = parser.parse_value()?;
            parser.skip_whitespace();
            parser.expect_end("fault")?;
            Err(fault_error(&fault))
        }
        other => {
            return Err(XmlRpcError::Malformed(format!(
                "expected <params> or <fault>, found {}",
                describe(other.as_ref())
            )))
        }
    };

    parser.skip_whitespace();
    parser.expect_end("methodResponse")?;
    result
}

fn fault_error(fault: &Value) -> XmlRpcError {
    let code = fault.get("faultCode").and_then(Value::as_i64).unwrap_or_default();
    let message = fault
        .get("faultString")
        .and_then(Value::as_str)
        .unwrap_or("unknown fault")
        .to_string();
    XmlRpcError::Fault { code, message }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Start(String),
    End(String),
    Empty(String),
    Text(String),
}

fn describe(token: Option<&Token>) -> String {
    match token {
        Some(Token::Start(tag)) => format!("<{}>", tag),
        Some(Token::End(tag)) => format!("</{}>", tag),
        Some(Token::Empty(tag)) => format!("<{}/>", tag),
        Some(Token::Text(text)) => format!("text {:?}", text),
        None => "end of document".to_string(),
    }
}

fn tokenize(body: &str) -> Result<Vec<Token>, XmlRpcError> {
    let mut reader = Reader::from_str(body);
    let mut tokens = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => tokens.push(Token::Start(tag_name(e.name().as_ref()))),
            Event::End(e) => tokens.push(Token::End(tag_name(e.name().as_ref()))),
            Event::Empty(e) => tokens.push(Token::Empty(tag_name(e.name().as_ref()))),
            Event::Text(e) => push_text(&mut tokens, e.unescape()?.into_owned()),
            Event::CData(e) => {
                let text = String::from_utf8(e.into_inner().into_owned())
                    .map_err(|e| XmlRpcError::Malformed(format!("CDATA is not UTF-8: {}", e)))?;
                push_text(&mut tokens, text);
            }
            Event::Eof => break,
            // 声明、注释、处理指令、DOCTYPE 与结构无关
            _ => {}
        }
    }

    Ok(tokens)
}

/// 相邻的文本与 CDATA 合并为一个 token
fn push_text(tokens: &mut Vec<Token>, text: String) {
    if let Some(Token::Text(previous)) = tokens.last_mut() {
        previous.push_str(&text);
    } else {
        tokens.push(Token::Text(text));
    }
}

fn tag_name(raw: &[u8]) -> String {
    let name = String::from_utf8_lossy(raw);
    // 去掉 ex:nil / ex:i8 等扩展类型的命名空间前缀
    match name.rsplit_once(':') {
        Some((_, local)) => local.to_string(),
        None => name.into_owned(),
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next_token(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn skip_whitespace(&mut self) {
        while let Some(Token::Text(text)) = self.peek() {
            if !text.trim().is_empty() {
                break;
            }
            self.pos += 1;
        }
    }

    fn expect_start(&mut self, name: &str) -> Result<(), XmlRpcError> {
        self.skip_whitespace();
        match self.next_token() {
            Some(Token::Start(tag)) if tag == name => Ok(()),
            other => Err(XmlRpcError::Malformed(format!(
                "expected <{}>, found {}",
                name,
                describe(other.as_ref())
            ))),
        }
    }

    fn expect_end(&mut self, name: &str) -> Result<(), XmlRpcError> {
        match self.next_token() {
            Some(Token::End(tag)) if tag == name => Ok(()),
            other => Err(XmlRpcError::Malformed(format!(
                "expected </{}>, found {}",
                name,
                describe(other.as_ref())
            ))),
        }
    }

    /// 读取可选的文本内容（空元素视为空字符串）
    fn take_text(&mut self) -> String {
        match self.peek() {
            Some(Token::Text(_)) => match self.next_token() {
                Some(Token::Text(text)) => text,
                _ => String::new(),
            },
            _ => String::new(),
        }
    }

    fn parse_value(&mut self) -> Result<Value, XmlRpcError> {
        match self.next_token() {
            Some(Token::Start(tag)) if tag == "value" => {}
            Some(Token::Empty(tag)) if tag == "value" => return Ok(Value::String(String::new())),
            other => {
                return Err(XmlRpcError::Malformed(format!(
                    "expected <value>, found {}",
                    describe(other.as_ref())
                )))
            }
        }

        // 无类型标签的 <value> 按字符串处理
        let text = self.take_text();
        let value = match self.next_token() {
            Some(Token::End(tag)) if tag == "value" => return Ok(Value::String(text)),
            Some(Token::Empty(tag)) => empty_typed(&tag)?,
            Some(Token::Start(tag)) if text.trim().is_empty() => {
                let value = self.parse_typed(&tag)?;
                self.expect_end(&tag)?;
                value
            }
            other => {
                return Err(XmlRpcError::Malformed(format!(
                    "unexpected {} inside <value>",
                    describe(other.as_ref())
                )))
            }
        };

        self.skip_whitespace();
        self.expect_end("value")?;
        Ok(value)
    }

    fn parse_typed(&mut self, tag: &str) -> Result<Value, XmlRpcError> {
        match tag {
            "int" | "i4" | "i8" => {
                let text = self.take_text();
                text.trim()
                    .parse::<i64>()
                    .map(Value::from)
                    .map_err(|_| XmlRpcError::Malformed(format!("invalid <{}> value {:?}", tag, text)))
            }
            "boolean" => match self.take_text().trim() {
                "1" => Ok(Value::Bool(true)),
                "0" => Ok(Value::Bool(false)),
                other => Err(XmlRpcError::Malformed(format!("invalid <boolean> value {:?}", other))),
            },
            "double" => {
                let text = self.take_text();
                text.trim()
                    .parse::<f64>()
                    .ok()
                    .and_then(Number::from_f64)
                    .map(Value::Number)
                    .ok_or_else(|| XmlRpcError::Malformed(format!("invalid <double> value {:?}", text)))
            }
            "string" | "dateTime.iso8601" | "base64" => Ok(Value::String(self.take_text())),
            "nil" => {
                self.skip_whitespace();
                Ok(Value::Null)
            }
            "struct" => self.parse_struct(),
            "array" => self.parse_array(),
            other => Err(XmlRpcError::Malformed(format!("unsupported value type <{}>", other))),
        }
    }

    fn parse_struct(&mut self) -> Result<Value, XmlRpcError> {
        let mut members = Map::new();
        loop {
            self.skip_whitespace();
            if let Some(Token::End(tag)) = self.peek() {
                if tag == "struct" {
                    return Ok(Value::Object(members));
                }
            }

            self.expect_start("member")?;
            self.expect_start("name")?;
            let name = self.take_text();
            self.expect_end("name")?;
            self.skip_whitespace();
            let value = self.parse_value()?;
            self.skip_whitespace();
            self.expect_end("member")?;
            members.insert(name, value);
        }
    }

    fn parse_array(&mut self) -> Result<Value, XmlRpcError> {
        self.skip_whitespace();
        let mut items = Vec::new();

        match self.next_token() {
            Some(Token::Empty(tag)) if tag == "data" => {}
            Some(Token::Start(tag)) if tag == "data" => loop {
                self.skip_whitespace();
                if let Some(Token::End(tag)) = self.peek() {
                    if tag == "data" {
                        self.pos += 1;
                        break;
                    }
                }
                items.push(self.parse_value()?);
            },
            other => {
                return Err(XmlRpcError::Malformed(format!(
                    "expected <data>, found {}",
                    describe(other.as_ref())
                )))
            }
        }

        self.skip_whitespace();
        Ok(Value::Array(items))
    }
}

fn empty_typed(tag: &str) -> Result<Value, XmlRpcError> {
    match tag {
        "string" | "dateTime.iso8601" | "base64" => Ok(Value::String(String::new())),
        "nil" => Ok(Value::Null),
        "struct" => Ok(Value::Object(Map::new())),
        other => Err(XmlRpcError::Malformed(format!("empty <{}/> has no value", other))),
    }
}
